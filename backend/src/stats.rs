//! Per-project daily counters.
//!
//! Every counter change is a single atomic update on the day's stats item, so concurrent
//! requests never lose increments. The item is created on first use with all
//! counters at zero and the nested maps in place, since nested counters need their parent map.

use std::collections::BTreeMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::dynamodb::keys::{self, STATS_ENTITY, VISITOR_ENTITY};
use crate::dynamodb::{
    av_map, av_s, entity_item, from_item, Query, SortKeyCondition, Store, StoreError,
    StoreResult, Update, WriteCondition,
};
use crate::utils::time;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeviceBreakdown {
    pub desktop: i64,
    pub mobile: i64,
    pub tablet: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
        }
    }

    /// Rough classification from a `User-Agent` header. Anything unrecognised is a desktop.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        let android_tablet = ua.contains("android") && !ua.contains("mobile");
        if ua.contains("ipad") || ua.contains("tablet") || android_tablet {
            Device::Tablet
        } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("android") {
            Device::Mobile
        } else {
            Device::Desktop
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub project_id: String,
    pub date: String,
    pub page_views: i64,
    pub unique_visitors: i64,
    pub signups: i64,
    pub conversion_rate: f64,
    pub avg_time_on_page: f64,
    pub bounce_rate: f64,
    #[serde(default)]
    pub top_referrers: BTreeMap<String, i64>,
    #[serde(default)]
    pub device_breakdown: DeviceBreakdown,
    pub created_at: String,
    pub updated_at: String,
}

impl DailyStats {
    fn empty(project_id: &str, date: &str) -> Self {
        let timestamp = time::now_iso_str();
        Self {
            project_id: project_id.to_string(),
            date: date.to_string(),
            page_views: 0,
            unique_visitors: 0,
            signups: 0,
            conversion_rate: 0.0,
            avg_time_on_page: 0.0,
            bounce_rate: 0.0,
            top_referrers: BTreeMap::new(),
            device_breakdown: DeviceBreakdown::default(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Returns the day's stats, creating a zeroed record if there is none. Safe to race: the loser
/// of a concurrent creation reads the winner's record.
pub async fn get_or_create_daily_stats(
    store: &dyn Store,
    project_id: &str,
    date: &str,
) -> StoreResult<DailyStats> {
    let key = keys::stats_key(project_id, date);
    if let Some(item) = store.get_item(&key).await? {
        return from_item(item);
    }

    let stats = DailyStats::empty(project_id, date);
    let item = entity_item(&stats, &key, None, STATS_ENTITY)?;
    match store
        .put_item(item, Some(WriteCondition::KeyNotExists))
        .await
    {
        Ok(()) => Ok(stats),
        Err(StoreError::ConditionalCheckFailed) => match store.get_item(&key).await? {
            Some(item) => from_item(item),
            None => Err(StoreError::Backend(format!(
                "Stats record {} vanished after a lost creation race",
                key.sk
            ))),
        },
        Err(e) => Err(e),
    }
}

async fn increment(
    store: &dyn Store,
    project_id: &str,
    date: &str,
    path: &[&str],
) -> StoreResult<DailyStats> {
    get_or_create_daily_stats(store, project_id, date).await?;
    let update = Update::new(keys::stats_key(project_id, date))
        .set("updatedAt", &time::now_iso_str())?
        .increment(path, 1)
        .with_condition(WriteCondition::KeyExists);
    from_item(store.update_item(update).await?)
}

pub async fn increment_page_view(
    store: &dyn Store,
    project_id: &str,
    date: &str,
) -> StoreResult<DailyStats> {
    increment(store, project_id, date, &["pageViews"]).await
}

pub async fn increment_signup(
    store: &dyn Store,
    project_id: &str,
    date: &str,
) -> StoreResult<DailyStats> {
    increment(store, project_id, date, &["signups"]).await
}

pub async fn record_device(
    store: &dyn Store,
    project_id: &str,
    date: &str,
    device: Device,
) -> StoreResult<DailyStats> {
    increment(store, project_id, date, &["deviceBreakdown", device.as_str()]).await
}

/// Counts a visit under the referrer's host name. Referrers that are not absolute URLs are
/// ignored and `None` is returned.
pub async fn record_referrer(
    store: &dyn Store,
    project_id: &str,
    date: &str,
    referrer: &str,
) -> StoreResult<Option<DailyStats>> {
    let host = match referrer_host(referrer) {
        Some(host) => host,
        None => return Ok(None),
    };
    let stats = increment(store, project_id, date, &["topReferrers", host.as_str()]).await?;
    Ok(Some(stats))
}

/// Counts the visitor once per day. Returns whether this was the visitor's first visit today.
pub async fn record_unique_visitor(
    store: &dyn Store,
    project_id: &str,
    date: &str,
    visitor_id: &str,
) -> StoreResult<bool> {
    let key = keys::visitor_key(project_id, date, visitor_id);
    let mut marker = key.to_item();
    marker.extend(av_map(&[
        av_s("projectId", project_id),
        av_s("date", date),
        av_s("visitorId", visitor_id),
        av_s("createdAt", &time::now_iso_str()),
        av_s(keys::ENTITY_TYPE, VISITOR_ENTITY),
    ]));
    match store
        .put_item(marker, Some(WriteCondition::KeyNotExists))
        .await
    {
        Ok(()) => {}
        Err(StoreError::ConditionalCheckFailed) => return Ok(false),
        Err(e) => return Err(e),
    }
    increment(store, project_id, date, &["uniqueVisitors"]).await?;
    Ok(true)
}

/// Stats for every recorded day in `start_date..=end_date`, oldest first. Days without any
/// activity have no record and are absent.
pub async fn get_daily_stats(
    store: &dyn Store,
    project_id: &str,
    start_date: &str,
    end_date: &str,
) -> StoreResult<Vec<DailyStats>> {
    let query = Query::table(keys::project_pk(project_id)).sort_key(SortKeyCondition::Between(
        keys::stats_sk(start_date),
        keys::stats_sk(end_date),
    ));
    let page = store.query(query).await?;
    page.items.into_iter().map(from_item).collect()
}

fn referrer_host(referrer: &str) -> Option<String> {
    let url = Url::parse(referrer).ok()?;
    let host = url.host_str()?.trim_start_matches("www.");
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}
