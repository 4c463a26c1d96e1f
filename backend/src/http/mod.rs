//! JSON REST API.
//!
//! Every response body is an envelope. Successes look like `{"success": true, "data": ...}`.
//! Failures are rendered by `ApiError`.
//!
//! Authenticated routes trust the bearer token: the gateway in front of this service has
//! already verified its signature, so only the payload is decoded here.

pub mod api;
pub mod internal;
pub mod public;

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// The signed-in user making a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: Option<String>,
    sub: Option<String>,
}

fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Identifies the caller from the `userId` claim, falling back to `sub`.
pub fn get_caller(req: &HttpRequest) -> ApiResult<Caller> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthorized)?;
    let claims = decode_claims(token.trim()).ok_or_else(ApiError::unauthorized)?;
    let user_id = claims
        .user_id
        .or(claims.sub)
        .filter(|id| !id.is_empty())
        .ok_or_else(ApiError::unauthorized)?;
    Ok(Caller { user_id })
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        success: true,
        data,
    })
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        success: true,
        data,
    })
}

pub fn no_content() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Parses the query string. Fields the type does not know are ignored.
pub fn parse_query<T: DeserializeOwned>(req: &HttpRequest) -> ApiResult<T> {
    web::Query::<T>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .map_err(|_| ApiError::bad_request("Invalid query string"))
}

pub fn header_str<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// First address in `X-Forwarded-For`, else the peer address.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded) = header_str(req, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(first.to_string());
        }
    }
    req.peer_addr().map(|addr| addr.ip().to_string())
}

pub fn user_agent(req: &HttpRequest) -> Option<String> {
    header_str(req, header::USER_AGENT.as_str()).map(str::to_string)
}

pub fn referer(req: &HttpRequest) -> Option<String> {
    header_str(req, header::REFERER.as_str()).map(str::to_string)
}

pub async fn route_not_found() -> ApiResult<HttpResponse> {
    Err(ApiError::not_found("Route not found"))
}

/// Registers every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(api::projects::create_project)
        .service(api::projects::list_projects)
        .service(api::projects::get_project)
        .service(api::projects::update_project)
        .service(api::projects::delete_project)
        .service(api::projects::publish_project)
        .service(api::projects::unpublish_project)
        .service(api::landing_pages::get_landing_page)
        .service(api::landing_pages::update_landing_page)
        .service(api::landing_pages::preview_landing_page)
        .service(api::landing_pages::generate_landing_page)
        .service(api::signups::list_signups)
        .service(api::events::list_events)
        .service(api::analytics::get_analytics)
        .service(api::analytics::summarize_analytics)
        .service(api::ideas::extract_idea)
        .service(api::users::get_me)
        .service(api::users::update_me)
        .service(api::users::delete_me)
        .service(public::capture_signup)
        .service(public::track_event)
        .service(public::get_public_page)
        .service(internal::pre_signup)
        .service(internal::post_confirmation)
        .service(internal::pre_token_generation);
}
