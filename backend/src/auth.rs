//! Identity provider triggers.
//!
//! The identity provider calls these while users sign up and sign in. Each trigger receives the
//! provider's event, may reject it, and returns the event with its `response` filled in. Fields
//! this service does not read are passed back untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dynamodb::{Store, StoreError};
use crate::users::{self, NewUser};

pub const CONFIRM_SIGN_UP_TRIGGER: &str = "PostConfirmation_ConfirmSignUp";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(default)]
    pub user_attributes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(default)]
    pub trigger_source: String,
    #[serde(default)]
    pub request: TriggerRequest,
    #[serde(default)]
    pub response: Map<String, Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TriggerEvent {
    fn email(&self) -> Option<&str> {
        self.request
            .user_attributes
            .get("email")
            .map(String::as_str)
            .filter(|email| !email.is_empty())
    }
}

/// Rejects signups without an email domain or from a blocked domain. Users always have to
/// confirm their email themselves.
pub fn pre_signup(
    mut event: TriggerEvent,
    blocked_domains: &[String],
) -> Result<TriggerEvent, AuthError> {
    let email = event
        .email()
        .ok_or_else(|| AuthError::Rejected("Email is required for signup".to_string()))?;
    let domain = match email.split_once('@') {
        Some((_, domain)) if !domain.is_empty() => domain.to_lowercase(),
        _ => return Err(AuthError::Rejected("Invalid email format".to_string())),
    };
    if blocked_domains
        .iter()
        .any(|blocked| blocked.to_lowercase() == domain)
    {
        return Err(AuthError::Rejected("Email domain not allowed".to_string()));
    }
    event
        .response
        .insert("autoConfirmUser".to_string(), Value::Bool(false));
    event
        .response
        .insert("autoVerifyEmail".to_string(), Value::Bool(false));
    Ok(event)
}

/// Creates the user record once the email is confirmed. Confirming twice keeps the first user.
pub async fn post_confirmation(
    store: &dyn Store,
    event: TriggerEvent,
) -> Result<TriggerEvent, AuthError> {
    if event.trigger_source != CONFIRM_SIGN_UP_TRIGGER {
        return Ok(event);
    }
    let email = match event.email() {
        Some(email) => email.to_string(),
        None => {
            log::warn!("Confirmed signup has no email attribute");
            return Ok(event);
        }
    };
    if users::get_user_by_email(store, &email).await?.is_some() {
        log::info!("User {} already exists", email);
        return Ok(event);
    }
    let name = match event.request.user_attributes.get("name") {
        Some(name) if !name.is_empty() => name.clone(),
        _ => match email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        },
    };
    let user = users::create_user(
        store,
        NewUser {
            email,
            name,
            avatar_url: None,
        },
    )
    .await?;
    log::info!("Created user {} for {}", user.id, user.email);
    Ok(event)
}

/// Adds `userId` and `plan` claims to the token. A failed lookup leaves the token as it is.
pub async fn pre_token_generation(store: &dyn Store, mut event: TriggerEvent) -> TriggerEvent {
    let email = match event.email() {
        Some(email) => email.to_string(),
        None => return event,
    };
    match users::get_user_by_email(store, &email).await {
        Ok(Some(user)) => {
            let claims = serde_json::json!({
                "claimsToAddOrOverride": {
                    "userId": user.id,
                    "plan": user.plan.as_str(),
                }
            });
            event
                .response
                .insert("claimsOverrideDetails".to_string(), claims);
        }
        Ok(None) => log::warn!("No user found for {} during token generation", email),
        Err(e) => log::error!("Failed to look up {} during token generation: {}", email, e),
    }
    event
}
