use actix_web::{get, post, route, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::ai;
use crate::error::{ApiError, ApiResult};
use crate::http::{self, api};
use crate::landing_pages::{self, LandingPage, LandingPageChanges, NewLandingPage};
use crate::projects::{self, Project, ProjectChanges, ProjectStatus};
use crate::publisher;
use crate::utils::time;
use crate::validation::{parse_body, parse_optional_body, UpdateLandingPageRequest};
use crate::BackendService;

async fn load_landing_page(service: &BackendService, project_id: &str) -> ApiResult<LandingPage> {
    landing_pages::get_landing_page(service.store.as_ref(), project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Landing page not found"))
}

#[get("/projects/{project_id}/landing-page")]
pub async fn get_landing_page(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let project = api::load_project(&service, &caller, &path).await?;
    let landing_page = load_landing_page(&service, &project.id).await?;
    Ok(http::ok(landing_page))
}

#[route(
    "/projects/{project_id}/landing-page",
    method = "PATCH",
    method = "POST"
)]
pub async fn update_landing_page(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let changes = parse_body::<UpdateLandingPageRequest>(&body)?.validate()?;
    let project = api::load_project(&service, &caller, &path).await?;
    let landing_page =
        landing_pages::update_landing_page(service.store.as_ref(), &project.id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Landing page not found"))?;
    Ok(http::ok(landing_page))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    html: String,
    preview_url: String,
}

/// Renders the page as it would be published, without uploading anything.
#[get("/projects/{project_id}/landing-page/preview")]
pub async fn preview_landing_page(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let project = api::load_project(&service, &caller, &path).await?;
    let landing_page = load_landing_page(&service, &project.id).await?;
    let html =
        publisher::render_landing_page(&project, &landing_page, service.publisher.api_url())
            .map_err(publisher::PublishError::from)?;
    Ok(http::ok(PreviewResponse {
        html,
        preview_url: service.publisher.page_url(&project.slug),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    regenerate: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    project_id: String,
    landing_page: LandingPage,
    generated_at: String,
}

async fn set_status(
    service: &BackendService,
    project: &Project,
    status: ProjectStatus,
) -> ApiResult<Project> {
    projects::update_project(
        service.store.as_ref(),
        &project.user_id,
        &project.id,
        &ProjectChanges::status(status),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))
}

async fn generate_and_store(
    service: &BackendService,
    project: &Project,
    replace_existing: bool,
) -> ApiResult<LandingPage> {
    let generated =
        ai::generate_landing_page(service.language_model.as_ref(), &service.models, project)
            .await?;
    let store = service.store.as_ref();
    if replace_existing {
        let changes = LandingPageChanges {
            headline: Some(generated.headline),
            subheadline: Some(generated.subheadline),
            sections: Some(generated.sections),
            theme: Some(generated.theme),
            cta_text: Some(generated.cta_text),
            seo_title: Some(generated.seo_title),
            seo_description: Some(generated.seo_description),
            ..Default::default()
        };
        return landing_pages::update_landing_page(store, &project.id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Landing page not found"));
    }
    let landing_page = landing_pages::create_landing_page(
        store,
        NewLandingPage {
            project_id: project.id.clone(),
            headline: generated.headline,
            subheadline: generated.subheadline,
            sections: generated.sections,
            theme: generated.theme,
            cta_text: generated.cta_text,
            cta_url: None,
            seo_title: generated.seo_title,
            seo_description: generated.seo_description,
            og_image: None,
            custom_css: None,
        },
    )
    .await?;
    Ok(landing_page)
}

/// Writes landing page copy with the language model. The project is `generating` while the
/// model runs, `ready` afterwards, and back to `draft` if generation fails.
#[post("/projects/{project_id}/landing-page/generate")]
pub async fn generate_landing_page(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let request: GenerateRequest = parse_optional_body(&body)?;
    let project = api::load_project(&service, &caller, &path).await?;
    let existing = landing_pages::get_landing_page(service.store.as_ref(), &project.id).await?;
    if existing.is_some() && !request.regenerate {
        return Err(ApiError::Conflict(
            "Landing page already exists. Set regenerate to true to replace it.".to_string(),
        ));
    }

    let project = set_status(&service, &project, ProjectStatus::Generating).await?;
    log::info!("Generating landing page for project {}", &project.id);
    match generate_and_store(&service, &project, existing.is_some()).await {
        Ok(landing_page) => {
            set_status(&service, &project, ProjectStatus::Ready).await?;
            log::info!(
                "Generated version {} of the landing page for project {}",
                landing_page.version,
                &project.id
            );
            Ok(http::ok(GenerateResponse {
                project_id: project.id,
                landing_page,
                generated_at: time::now_iso_str(),
            }))
        }
        Err(e) => {
            if let Err(reset_error) = set_status(&service, &project, ProjectStatus::Draft).await {
                log::error!(
                    "Could not reset project {} to draft: {}",
                    &project.id,
                    reset_error
                );
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;

    use crate::http;
    use crate::projects::{self, ProjectStatus};
    use crate::testing::fixtures::{self, LANDING_PAGE_REPLY};
    use crate::testing::{auth_header, default_backend_service, read_json};

    #[actix_web::test]
    async fn test_generate_landing_page() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let project = fixtures::create_project(backend.store.as_ref(), "u_1").await;

        backend.model.reply(LANDING_PAGE_REPLY);
        let request = TestRequest::post()
            .uri(&format!("/projects/{}/landing-page/generate", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["projectId"], project.id.as_str());
        assert_eq!(body["data"]["landingPage"]["headline"], "Walks, handled");
        assert_eq!(body["data"]["landingPage"]["version"], 1);
        assert_eq!(
            body["data"]["landingPage"]["theme"]["primaryColor"],
            "#2563eb"
        );
        let request_sent = backend.model.last_request().unwrap();
        assert_eq!(request_sent.model, "main-model");

        let found = projects::get_project(backend.store.as_ref(), "u_1", &project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, ProjectStatus::Ready);

        // A second generation needs an explicit regenerate.
        let request = TestRequest::post()
            .uri(&format!("/projects/{}/landing-page/generate", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        backend.model.reply(LANDING_PAGE_REPLY);
        let request = TestRequest::post()
            .uri(&format!("/projects/{}/landing-page/generate", project.id))
            .insert_header(auth_header("u_1"))
            .set_json(json!({"regenerate": true}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["landingPage"]["version"], 2);
    }

    #[actix_web::test]
    async fn test_generation_failure_resets_to_draft() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let project = fixtures::create_project(backend.store.as_ref(), "u_1").await;

        backend.model.fail("model overloaded");
        let request = TestRequest::post()
            .uri(&format!("/projects/{}/landing-page/generate", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");

        let found = projects::get_project(backend.store.as_ref(), "u_1", &project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, ProjectStatus::Draft);
    }

    #[actix_web::test]
    async fn test_get_update_and_preview() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let project = fixtures::create_project(backend.store.as_ref(), "u_1").await;
        let uri = format!("/projects/{}/landing-page", project.id);

        let request = TestRequest::get()
            .uri(&uri)
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        fixtures::create_landing_page(backend.store.as_ref(), &project.id).await;

        let request = TestRequest::patch()
            .uri(&uri)
            .insert_header(auth_header("u_1"))
            .set_json(json!({"headline": "New headline", "theme": {
                "primaryColor": "#000", "secondaryColor": "#111111",
                "backgroundColor": "#ffffff", "textColor": "#222222",
                "fontFamily": "Georgia, serif"
            }}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["headline"], "New headline");
        assert_eq!(body["data"]["theme"]["primaryColor"], "#000");
        assert_eq!(body["data"]["version"], 2);

        let request = TestRequest::post()
            .uri(&uri)
            .insert_header(auth_header("u_1"))
            .set_json(json!({"ctaUrl": "not a url", "theme": {
                "primaryColor": "blue", "secondaryColor": "#111111",
                "backgroundColor": "#ffffff", "textColor": "#222222",
                "fontFamily": "Georgia, serif"
            }}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["details"]["ctaUrl"], "Invalid url");
        assert_eq!(
            body["error"]["details"]["theme.primaryColor"],
            "Invalid hex color"
        );

        let request = TestRequest::get()
            .uri(&format!("{}/preview", uri))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert!(body["data"]["html"]
            .as_str()
            .unwrap()
            .contains("<h1>New headline</h1>"));
        assert_eq!(
            body["data"]["previewUrl"],
            format!("https://{}.maistro.test", project.slug)
        );
        assert!(backend.storage.keys().is_empty());
    }
}
