//! Identity provider trigger hooks. Replies are the provider's event with `response` filled in,
//! not the usual envelope.

use actix_web::{post, web, HttpRequest, HttpResponse};

use crate::auth::{self, TriggerEvent};
use crate::error::{ApiError, ApiResult};
use crate::http;
use crate::validation::parse_body;
use crate::BackendService;

pub const AUTH_TRIGGER_SECRET_HEADER: &str = "x-auth-trigger-secret";

/// Passes when no secret is configured.
fn check_trigger_secret(req: &HttpRequest, service: &BackendService) -> ApiResult<()> {
    let expected = match service.config.auth_trigger_secret.as_deref() {
        Some(secret) => secret,
        None => return Ok(()),
    };
    match http::header_str(req, AUTH_TRIGGER_SECRET_HEADER) {
        None => Err(ApiError::unauthorized()),
        Some(secret) if secret == expected => Ok(()),
        Some(_) => Err(ApiError::Forbidden("Invalid trigger secret".to_string())),
    }
}

fn read_event(
    req: &HttpRequest,
    service: &BackendService,
    body: &[u8],
) -> ApiResult<TriggerEvent> {
    check_trigger_secret(req, service)?;
    parse_body(body)
}

#[post("/internal/auth/pre-signup")]
pub async fn pre_signup(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let event = read_event(&req, &service, &body)?;
    let event = auth::pre_signup(event, &service.config.blocked_email_domains).map_err(|e| {
        log::info!("Signup rejected: {}", e);
        ApiError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(event))
}

#[post("/internal/auth/post-confirmation")]
pub async fn post_confirmation(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let event = read_event(&req, &service, &body)?;
    let event = auth::post_confirmation(service.store.as_ref(), event).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[post("/internal/auth/pre-token-generation")]
pub async fn pre_token_generation(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let event = read_event(&req, &service, &body)?;
    let event = auth::pre_token_generation(service.store.as_ref(), event).await;
    Ok(HttpResponse::Ok().json(event))
}
