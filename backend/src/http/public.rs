//! Routes called by published landing pages. No identity is required. The `projectId` in a body
//! is the project's slug, and only published projects accept traffic.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::events::{self, EventType, NewEvent};
use crate::http;
use crate::landing_pages::{self, LandingPage};
use crate::projects::{self, Project, ProjectStatus};
use crate::signups::{self, NewSignup};
use crate::stats::{self, Device};
use crate::utils::{slug, time};
use crate::validation::{parse_body, CaptureSignupRequest, TrackEventRequest};
use crate::BackendService;

/// Strings that could never be a generated slug are not looked up.
async fn load_published_project(service: &BackendService, project_slug: &str) -> ApiResult<Project> {
    if !slug::is_valid_slug(project_slug) {
        return Err(ApiError::not_found("Project not found"));
    }
    match projects::get_project_by_slug(service.store.as_ref(), project_slug).await? {
        Some(project) if project.status == ProjectStatus::Published => Ok(project),
        _ => Err(ApiError::not_found("Project not found")),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CapturedSignup {
    id: String,
    email: String,
    created_at: String,
}

#[post("/public/signup")]
pub async fn capture_signup(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let input = parse_body::<CaptureSignupRequest>(&body)?.validate()?;
    let project = load_published_project(&service, &input.project_id).await?;
    let store = service.store.as_ref();
    let signup = signups::create_signup(
        store,
        NewSignup {
            project_id: project.id.clone(),
            email: input.email,
            name: input.name,
            source: input.source,
            referrer: http::referer(&req).or(input.referrer),
            user_agent: http::user_agent(&req),
            ip_address: http::client_ip(&req),
            metadata: input.metadata,
        },
    )
    .await?;
    stats::increment_signup(store, &project.id, &time::today_date_key()).await?;
    log::info!("Signup {} captured for project {}", &signup.id, &project.id);
    Ok(http::created(CapturedSignup {
        id: signup.id,
        email: signup.email,
        created_at: signup.created_at,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackedEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: EventType,
    created_at: String,
}

/// Records the event. Page views also feed the day's counters: views, device, referrer host and
/// unique visitors.
#[post("/public/events")]
pub async fn track_event(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let input = parse_body::<TrackEventRequest>(&body)?.validate()?;
    let project = load_published_project(&service, &input.project_id).await?;
    let store = service.store.as_ref();
    let user_agent = http::user_agent(&req);
    let referrer = input.referrer.or_else(|| http::referer(&req));
    let event = events::create_event(
        store,
        NewEvent {
            project_id: project.id.clone(),
            event_type: input.event_type,
            name: input.name,
            properties: input.properties,
            session_id: input.session_id,
            visitor_id: input.visitor_id,
            referrer: referrer.clone(),
            user_agent: user_agent.clone(),
            ip_address: http::client_ip(&req),
        },
    )
    .await?;

    if event.event_type == EventType::PageView {
        let today = time::today_date_key();
        stats::increment_page_view(store, &project.id, &today).await?;
        let device = Device::from_user_agent(user_agent.as_deref().unwrap_or_default());
        stats::record_device(store, &project.id, &today, device).await?;
        if let Some(referrer) = referrer.as_ref() {
            stats::record_referrer(store, &project.id, &today, referrer).await?;
        }
        if let Some(visitor_id) = event.visitor_id.as_ref() {
            stats::record_unique_visitor(store, &project.id, &today, visitor_id).await?;
        }
    }

    Ok(http::created(TrackedEvent {
        id: event.id,
        event_type: event.event_type,
        created_at: event.created_at,
    }))
}

#[derive(Serialize)]
struct PublicProject {
    id: String,
    name: String,
    slug: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicPage {
    project: PublicProject,
    landing_page: LandingPage,
}

#[get("/public/pages/{slug}")]
pub async fn get_public_page(
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let project = load_published_project(&service, &path).await?;
    let landing_page = landing_pages::get_landing_page(service.store.as_ref(), &project.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Landing page not found"))?;
    Ok(http::ok(PublicPage {
        project: PublicProject {
            id: project.id,
            name: project.name,
            slug: project.slug,
        },
        landing_page,
    }))
}
