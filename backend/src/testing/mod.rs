//! Test helpers: a `BackendService` wired to in-memory fakes, bearer tokens and fixtures.
//!
//! Usage:
//!
//! ```ignore
//! #[actix_web::test]
//! async fn test_my_route() {
//!     let backend = default_backend_service();
//!     let app = test::init_service(
//!         App::new()
//!             .app_data(backend.service.clone())
//!             .configure(http::configure),
//!     )
//!     .await;
//!     let request = TestRequest::get()
//!         .uri("/projects")
//!         .insert_header(auth_header("u_1"))
//!         .to_request();
//!     let response = test::call_service(&app, request).await;
//!     // The fakes stay reachable through `backend`, eg. `backend.store.len()`.
//! }
//! ```

pub mod fixtures;

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::{test, web};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::ai::tests::ScriptedModel;
use crate::ai::Models;
use crate::config::Config;
use crate::dynamodb::MemoryStore;
use crate::publisher::tests::RecordingCdn;
use crate::publisher::{MemoryStorage, Publisher};
use crate::BackendService;

pub const TEST_API_URL: &str = "https://api.test";
pub const TEST_LANDING_DOMAIN: &str = "maistro.test";
pub const TEST_AUTH_TRIGGER_SECRET: &str = "trigger-secret";

pub struct TestBackend {
    pub service: web::Data<BackendService>,
    pub store: Arc<MemoryStore>,
    pub model: Arc<ScriptedModel>,
    pub storage: Arc<MemoryStorage>,
    pub cdn: Arc<RecordingCdn>,
}

pub fn test_config() -> Config {
    Config {
        landing_domain: TEST_LANDING_DOMAIN.to_string(),
        api_url: TEST_API_URL.to_string(),
        model: "main-model".to_string(),
        fast_model: "fast-model".to_string(),
        blocked_email_domains: vec!["mailinator.com".to_string()],
        auth_trigger_secret: Some(TEST_AUTH_TRIGGER_SECRET.to_string()),
        ..Config::default()
    }
}

pub fn default_backend_service() -> TestBackend {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new());
    let storage = Arc::new(MemoryStorage::new());
    let cdn = Arc::new(RecordingCdn::default());
    let publisher = Publisher::new(
        storage.clone(),
        Some(cdn.clone() as Arc<dyn crate::publisher::CdnInvalidator>),
        &config.landing_domain,
        &config.api_url,
    );
    let service = web::Data::new(BackendService {
        store: store.clone(),
        language_model: model.clone(),
        models: Models {
            main: config.model.clone(),
            fast: config.fast_model.clone(),
        },
        publisher,
        config,
    });
    TestBackend {
        service,
        store,
        model,
        storage,
        cdn,
    }
}

/// An unsigned JWT carrying a `userId` claim. Signatures are not checked by this service.
pub fn bearer_token(user_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": format!("sub-{}", user_id),
        "userId": user_id,
        "email": "ada@example.com",
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn auth_header(user_id: &str) -> (header::HeaderName, String) {
    (
        header::AUTHORIZATION,
        format!("Bearer {}", bearer_token(user_id)),
    )
}

pub async fn read_json<B: MessageBody>(response: ServiceResponse<B>) -> Value {
    test::read_body_json(response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;
    use actix_web::App;
    use regex::Regex;
    use serde_json::json;

    use crate::http;

    #[actix_web::test]
    async fn test_validation_flow_end_to_end() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;

        let request = TestRequest::post()
            .uri("/projects")
            .insert_header(auth_header("u_1"))
            .set_json(json!({
                "name": "Demo",
                "description": "A test project description",
                "targetAudience": "Testers",
                "problem": "Problem text here",
                "solution": "Solution text here"
            }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "draft");
        let slug = body["data"]["slug"].as_str().unwrap().to_string();
        assert!(Regex::new(r"^demo-[a-z0-9]{8}$").unwrap().is_match(&slug));
        let project_id = body["data"]["id"].as_str().unwrap().to_string();

        let request = TestRequest::post()
            .uri(&format!("/projects/{}/publish", project_id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let request = TestRequest::post()
            .uri("/public/signup")
            .set_json(json!({"projectId": slug, "email": "ada@example.com"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        assert!(backend.storage.keys().is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_route() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure)
                .default_service(web::to(http::route_not_found)),
        )
        .await;
        let request = TestRequest::get().uri("/nope").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
