use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dynamodb::keys::{self, EVENT_ENTITY, EVENT_PREFIX};
use crate::dynamodb::{
    decode_optional_cursor, entity_item, Page, Query, SortKeyCondition, Store, StoreResult,
};
use crate::ids::{new_id, IdType};
use crate::utils::time;

pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    ButtonClick,
    FormStart,
    FormSubmit,
    ScrollDepth,
    TimeOnPage,
    Custom,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            EventType::PageView => "page_view",
            EventType::ButtonClick => "button_click",
            EventType::FormStart => "form_start",
            EventType::FormSubmit => "form_submit",
            EventType::ScrollDepth => "scroll_depth",
            EventType::TimeOnPage => "time_on_page",
            EventType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page_view" => Some(EventType::PageView),
            "button_click" => Some(EventType::ButtonClick),
            "form_start" => Some(EventType::FormStart),
            "form_submit" => Some(EventType::FormSubmit),
            "scroll_depth" => Some(EventType::ScrollDepth),
            "time_on_page" => Some(EventType::TimeOnPage),
            "custom" => Some(EventType::Custom),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug)]
pub struct NewEvent {
    pub project_id: String,
    pub event_type: EventType,
    pub name: Option<String>,
    pub properties: Option<Map<String, Value>>,
    pub session_id: Option<String>,
    pub visitor_id: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl NewEvent {
    pub fn new(project_id: &str, event_type: EventType) -> Self {
        Self {
            project_id: project_id.to_string(),
            event_type,
            name: None,
            properties: None,
            session_id: None,
            visitor_id: None,
            referrer: None,
            user_agent: None,
            ip_address: None,
        }
    }
}

pub async fn create_event(store: &dyn Store, input: NewEvent) -> StoreResult<Event> {
    let event = Event {
        id: new_id(IdType::Event),
        project_id: input.project_id,
        event_type: input.event_type,
        name: input.name.filter(|s| !s.is_empty()),
        properties: input.properties.filter(|p| !p.is_empty()),
        session_id: input.session_id.filter(|s| !s.is_empty()),
        visitor_id: input.visitor_id.filter(|s| !s.is_empty()),
        referrer: input.referrer.filter(|s| !s.is_empty()),
        user_agent: input.user_agent.filter(|s| !s.is_empty()),
        ip_address: input.ip_address.filter(|s| !s.is_empty()),
        created_at: time::now_iso_str(),
    };
    let item = entity_item(
        &event,
        &keys::event_key(&event.project_id, &event.created_at, &event.id),
        None,
        EVENT_ENTITY,
    )?;
    store.put_item(item, None).await?;
    Ok(event)
}

/// Newest first. The type filter is applied to the fetched page, so a page may hold fewer than
/// `limit` events even when more follow.
pub async fn list_events(
    store: &dyn Store,
    project_id: &str,
    event_type: Option<EventType>,
    limit: Option<i64>,
    cursor: Option<&str>,
) -> StoreResult<Page<Event>> {
    let mut query = events_query(project_id)
        .limit(limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .newest_first()
        .start_after(decode_optional_cursor(cursor)?);
    if let Some(event_type) = event_type {
        query = query.filter_eq("type", event_type.as_str());
    }
    Page::from_query_page(store.query(query).await?)
}

pub async fn count_events(
    store: &dyn Store,
    project_id: &str,
    event_type: Option<EventType>,
) -> StoreResult<i64> {
    let mut query = events_query(project_id);
    if let Some(event_type) = event_type {
        query = query.filter_eq("type", event_type.as_str());
    }
    store.count(query).await
}

fn events_query(project_id: &str) -> Query {
    Query::table(keys::project_pk(project_id))
        .sort_key(SortKeyCondition::BeginsWith(EVENT_PREFIX.to_string()))
}
