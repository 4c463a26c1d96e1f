use actix_web::{delete, get, patch, web, HttpRequest, HttpResponse};

use crate::error::{ApiError, ApiResult};
use crate::http;
use crate::users;
use crate::validation::{parse_body, UpdateUserRequest};
use crate::BackendService;

#[get("/users/me")]
pub async fn get_me(
    req: HttpRequest,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let user = users::get_user_by_id(service.store.as_ref(), &caller.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(http::ok(user))
}

#[patch("/users/me")]
pub async fn update_me(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let changes = parse_body::<UpdateUserRequest>(&body)?.validate()?;
    let user = users::update_user(service.store.as_ref(), &caller.user_id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(http::ok(user))
}

/// Removes only the user record. Projects stay behind.
#[delete("/users/me")]
pub async fn delete_me(
    req: HttpRequest,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    users::delete_user(service.store.as_ref(), &caller.user_id).await?;
    log::info!("Deleted user {}", &caller.user_id);
    Ok(http::no_content())
}
