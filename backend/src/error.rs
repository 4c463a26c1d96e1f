//! Errors returned by HTTP handlers.
//!
//! Every error is rendered as
//!
//! ```json
//! {"success": false, "error": {"code": "NOT_FOUND", "message": "Project not found"}}
//! ```
//!
//! Failures from the store, the language model or the publisher are logged and surface as a
//! generic `INTERNAL_ERROR`. Nothing is retried.

use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::ai::LlmError;
use crate::auth::AuthError;
use crate::dynamodb::StoreError;
use crate::publisher::PublishError;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const FORBIDDEN: &str = "FORBIDDEN";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const CONFLICT: &str = "CONFLICT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
pub const ALREADY_PUBLISHED: &str = "ALREADY_PUBLISHED";
pub const NOT_PUBLISHED: &str = "NOT_PUBLISHED";

/// Field name to message, eg. `{"email": "Invalid email address"}`.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<FieldErrors>,
    },
    /// A 400 with a handler-specific code, eg. `ALREADY_PUBLISHED`.
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        ApiError::Validation {
            message: message.to_string(),
            details: None,
        }
    }

    pub fn validation(details: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn not_found(message: &str) -> Self {
        ApiError::NotFound(message.to_string())
    }

    pub fn internal() -> Self {
        ApiError::Internal("Internal server error".to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => VALIDATION_ERROR,
            ApiError::BadRequest { code, .. } => *code,
            ApiError::Unauthorized(_) => UNAUTHORIZED,
            ApiError::Forbidden(_) => FORBIDDEN,
            ApiError::NotFound(_) => NOT_FOUND,
            ApiError::Conflict(_) => CONFLICT,
            ApiError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: ErrorBody<'a>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            ApiError::Validation { details, .. } => details.as_ref(),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                details,
            },
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConditionalCheckFailed => {
                ApiError::Conflict("Resource already exists".to_string())
            }
            StoreError::InvalidCursor => {
                let mut details = FieldErrors::new();
                details.insert("cursor".to_string(), "Invalid cursor".to_string());
                ApiError::validation(details)
            }
            e => {
                log::error!("{}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        log::error!("{}", e);
        ApiError::internal()
    }
}

impl From<PublishError> for ApiError {
    fn from(e: PublishError) -> Self {
        log::error!("{}", e);
        ApiError::internal()
    }
}

/// A rejected trigger is a 400 carrying the reason, which the identity provider shows the user.
impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Rejected(message) => ApiError::bad_request(&message),
            AuthError::Store(e) => e.into(),
        }
    }
}
