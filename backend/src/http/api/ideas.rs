use actix_web::{post, web, HttpRequest, HttpResponse};

use crate::ai;
use crate::error::ApiResult;
use crate::http;
use crate::validation::{parse_body, ExtractIdeaRequest};
use crate::BackendService;

/// Turns a free-text pitch into the fields of a new project. Nothing is stored.
#[post("/ideas/extract")]
pub async fn extract_idea(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    http::get_caller(&req)?;
    let input = parse_body::<ExtractIdeaRequest>(&body)?.validate()?;
    let idea =
        ai::extract_idea(service.language_model.as_ref(), &service.models, &input).await?;
    Ok(http::ok(idea))
}
