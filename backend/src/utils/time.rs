use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// Return ISO 8601 date-time string with UTC timezone using millisecond resolution.
///
/// eg.
/// ```ignore
/// "2021-02-12T13:30:41.791Z"
/// ```
pub fn date_time_iso_str(date_time: &DateTime<Utc>) -> String {
    date_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time as an ISO 8601 string. Used for every `createdAt` and `updatedAt`.
pub fn now_iso_str() -> String {
    date_time_iso_str(&Utc::now())
}

/// Calendar date key, eg. "2021-02-12". Daily stats are keyed by it.
pub fn date_key(date_time: &DateTime<Utc>) -> String {
    date_time.format("%Y-%m-%d").to_string()
}

pub fn today_date_key() -> String {
    date_key(&Utc::now())
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Parses a "YYYY-MM-DD" date key.
pub fn parse_date_key(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Accepts either a date key or a full ISO 8601 date-time and returns the date key.
pub fn normalize_date_key(s: &str) -> Option<String> {
    if let Some(date) = parse_date_key(s) {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    let date_time = DateTime::parse_from_rfc3339(s).ok()?;
    Some(date_key(&date_time.with_timezone(&Utc)))
}
