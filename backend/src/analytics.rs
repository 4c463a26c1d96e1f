use serde::{Deserialize, Serialize};

use crate::dynamodb::{Store, StoreResult};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::events::{self, EventType};
use crate::signups;
use crate::stats::{self, DailyStats};
use crate::utils::time;

/// Length of the default reporting window.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Period {
    pub start: String,
    pub end: String,
}

impl Period {
    /// Defaults to the last 30 days. Dates may be date keys or ISO 8601 date-times.
    pub fn resolve(start: Option<&str>, end: Option<&str>) -> ApiResult<Self> {
        let mut errors = FieldErrors::new();
        let mut date = |field: &str, value: Option<&str>, default: String| match value {
            None | Some("") => default,
            Some(value) => match time::normalize_date_key(value) {
                Some(date) => date,
                None => {
                    errors.insert(field.to_string(), "Invalid date".to_string());
                    default
                }
            },
        };
        let start = date(
            "startDate",
            start,
            time::date_key(&time::days_ago(DEFAULT_PERIOD_DAYS)),
        );
        let end = date("endDate", end, time::today_date_key());
        if errors.is_empty() && start > end {
            errors.insert(
                "startDate".to_string(),
                "Start date must not be after end date".to_string(),
            );
        }
        if errors.is_empty() {
            Ok(Self { start, end })
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalytics {
    pub project_id: String,
    /// Every page view ever tracked, not only those inside the period.
    pub total_page_views: i64,
    pub total_unique_visitors: i64,
    /// Every signup ever captured.
    pub total_signups: i64,
    /// Percent, rounded to two decimals.
    pub overall_conversion_rate: f64,
    pub daily_stats: Vec<DailyStats>,
    pub period: Period,
}

/// Signups per 100 unique visitors, rounded to two decimals. 0 without visitors.
pub fn conversion_rate(signups: i64, unique_visitors: i64) -> f64 {
    if unique_visitors <= 0 {
        return 0.0;
    }
    let rate = signups as f64 / unique_visitors as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Reads the period's daily stats and the overall signup and page view counts concurrently.
pub async fn project_analytics(
    store: &dyn Store,
    project_id: &str,
    period: Period,
) -> StoreResult<ProjectAnalytics> {
    let (daily_stats, total_signups, total_page_views) = futures::try_join!(
        stats::get_daily_stats(store, project_id, &period.start, &period.end),
        signups::count_signups(store, project_id),
        events::count_events(store, project_id, Some(EventType::PageView)),
    )?;
    let total_unique_visitors = daily_stats.iter().map(|d| d.unique_visitors).sum();
    Ok(ProjectAnalytics {
        project_id: project_id.to_string(),
        total_page_views,
        total_unique_visitors,
        total_signups,
        overall_conversion_rate: conversion_rate(total_signups, total_unique_visitors),
        daily_stats,
        period,
    })
}
