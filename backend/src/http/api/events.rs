use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::events::{self, EventType};
use crate::http::{self, api};
use crate::validation::PaginationQuery;
use crate::BackendService;

#[derive(Debug, Default, Deserialize)]
struct EventsQuery {
    limit: Option<String>,
    cursor: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
}

impl EventsQuery {
    fn event_type(&self) -> ApiResult<Option<EventType>> {
        match self.event_type.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => match EventType::parse(s) {
                Some(event_type) => Ok(Some(event_type)),
                None => {
                    let mut details = FieldErrors::new();
                    details.insert("type".to_string(), "Invalid event type".to_string());
                    Err(ApiError::validation(details))
                }
            },
        }
    }
}

/// Raw events, newest first. The `type` filter is applied to each page after the limit, so a
/// filtered page can hold fewer items than asked for while `nextCursor` is still set.
#[get("/projects/{project_id}/events")]
pub async fn list_events(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let query: EventsQuery = http::parse_query(&req)?;
    let event_type = query.event_type()?;
    let pagination = PaginationQuery {
        limit: query.limit,
        cursor: query.cursor,
    };
    let limit = pagination.limit(events::DEFAULT_PAGE_SIZE)?;
    let project = api::load_project(&service, &caller, &path).await?;
    let page = events::list_events(
        service.store.as_ref(),
        &project.id,
        event_type,
        Some(limit),
        pagination.cursor(),
    )
    .await?;
    Ok(http::ok(page))
}
