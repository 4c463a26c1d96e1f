use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::prompts::{self, render};
use super::{ChatRequest, LanguageModel, LlmError, Models};
use crate::analytics::ProjectAnalytics;
use crate::landing_pages::{Section, Theme};
use crate::projects::Project;
use crate::utils::time;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedIdea {
    pub name: String,
    pub description: String,
    pub target_audience: String,
    pub problem: String,
    pub solution: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLandingPage {
    pub headline: String,
    pub subheadline: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub cta_text: String,
    pub seo_title: String,
    pub seo_description: String,
    /// Not generated. Always the default theme.
    #[serde(default)]
    pub theme: Theme,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarketPotential {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub summary: String,
    pub validation_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    pub market_potential: MarketPotential,
}

async fn complete_json<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    request: ChatRequest,
) -> Result<T, LlmError> {
    let reply = model.complete(request).await?;
    Ok(serde_json::from_str(&reply)?)
}

/// Structures a free-text idea description.
pub async fn extract_idea(
    model: &dyn LanguageModel,
    models: &Models,
    input: &str,
) -> Result<ExtractedIdea, LlmError> {
    let request = ChatRequest {
        model: models.fast.clone(),
        system: prompts::IDEA_EXTRACTION_SYSTEM.to_string(),
        user: render(prompts::IDEA_EXTRACTION_USER, &[("input", input)]),
        temperature: 0.3,
        max_tokens: 500,
    };
    complete_json(model, request).await
}

/// Writes landing page copy for the project. The theme is not generated.
pub async fn generate_landing_page(
    model: &dyn LanguageModel,
    models: &Models,
    project: &Project,
) -> Result<GeneratedLandingPage, LlmError> {
    let request = ChatRequest {
        model: models.main.clone(),
        system: prompts::LANDING_PAGE_SYSTEM.to_string(),
        user: render(
            prompts::LANDING_PAGE_USER,
            &[
                ("name", project.name.as_str()),
                ("description", project.description.as_str()),
                ("targetAudience", project.target_audience.as_str()),
                ("problem", project.problem.as_str()),
                ("solution", project.solution.as_str()),
            ],
        ),
        temperature: 0.7,
        max_tokens: 2000,
    };
    let generated: GeneratedLandingPage = complete_json(model, request).await?;
    Ok(GeneratedLandingPage {
        theme: Theme::default(),
        ..generated
    })
}

/// Asks for an assessment of the validation results.
pub async fn summarize_results(
    model: &dyn LanguageModel,
    models: &Models,
    project_name: &str,
    analytics: &ProjectAnalytics,
) -> Result<ResultsSummary, LlmError> {
    let mut referrers: BTreeMap<&str, i64> = BTreeMap::new();
    for day in analytics.daily_stats.iter() {
        for (host, count) in day.top_referrers.iter() {
            *referrers.entry(host.as_str()).or_insert(0) += count;
        }
    }
    let referrers_text = if referrers.is_empty() {
        "None".to_string()
    } else {
        referrers
            .iter()
            .map(|(host, count)| format!("- {}: {}", host, count))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let days_recorded = analytics.daily_stats.len().max(1) as f64;
    let avg_time_on_page = analytics
        .daily_stats
        .iter()
        .map(|d| d.avg_time_on_page)
        .sum::<f64>()
        / days_recorded;
    let avg_bounce_rate =
        analytics.daily_stats.iter().map(|d| d.bounce_rate).sum::<f64>() / days_recorded;
    let days = period_days(&analytics.period.start, &analytics.period.end);

    let request = ChatRequest {
        model: models.main.clone(),
        system: prompts::RESULTS_SUMMARY_SYSTEM.to_string(),
        user: render(
            prompts::RESULTS_SUMMARY_USER,
            &[
                ("projectName", project_name),
                ("startDate", analytics.period.start.as_str()),
                ("endDate", analytics.period.end.as_str()),
                ("days", days.to_string().as_str()),
                ("pageViews", analytics.total_page_views.to_string().as_str()),
                ("uniqueVisitors", analytics.total_unique_visitors.to_string().as_str()),
                ("signups", analytics.total_signups.to_string().as_str()),
                ("conversionRate", analytics.overall_conversion_rate.to_string().as_str()),
                ("avgTimeOnPage", avg_time_on_page.to_string().as_str()),
                ("bounceRate", avg_bounce_rate.to_string().as_str()),
                ("topReferrers", referrers_text.as_str()),
            ],
        ),
        temperature: 0.5,
        max_tokens: 1000,
    };
    complete_json(model, request).await
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Some(date) = time::parse_date_key(s) {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole days between the two dates, rounded up. 0 if either date is unreadable.
fn period_days(start: &str, end: &str) -> i64 {
    let (start, end) = match (parse_instant(start), parse_instant(end)) {
        (Some(start), Some(end)) => (start, end),
        _ => return 0,
    };
    let millis = (end - start).num_milliseconds();
    let day = 24 * 60 * 60 * 1000;
    if millis > 0 {
        (millis + day - 1) / day
    } else {
        millis / day
    }
}
