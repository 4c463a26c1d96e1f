use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::ai::{self, ResultsSummary};
use crate::analytics::{self, Period, ProjectAnalytics};
use crate::error::ApiResult;
use crate::http::{self, api, Caller};
use crate::projects::Project;
use crate::BackendService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn load_analytics(
    req: &HttpRequest,
    service: &BackendService,
    caller: &Caller,
    project_id: &str,
) -> ApiResult<(Project, ProjectAnalytics)> {
    let query: AnalyticsQuery = http::parse_query(req)?;
    let period = Period::resolve(query.start_date.as_deref(), query.end_date.as_deref())?;
    let project = api::load_project(service, caller, project_id).await?;
    let analytics =
        analytics::project_analytics(service.store.as_ref(), &project.id, period).await?;
    Ok((project, analytics))
}

#[get("/projects/{project_id}/analytics")]
pub async fn get_analytics(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let (_, analytics) = load_analytics(&req, &service, &caller, &path).await?;
    Ok(http::ok(analytics))
}

#[derive(Serialize)]
struct SummaryResponse {
    analytics: ProjectAnalytics,
    summary: ResultsSummary,
}

#[post("/projects/{project_id}/analytics/summary")]
pub async fn summarize_analytics(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let (project, analytics) = load_analytics(&req, &service, &caller, &path).await?;
    let summary = ai::summarize_results(
        service.language_model.as_ref(),
        &service.models,
        &project.name,
        &analytics,
    )
    .await?;
    Ok(http::ok(SummaryResponse { analytics, summary }))
}
