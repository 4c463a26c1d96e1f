use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::{ApiError, ApiResult, ALREADY_PUBLISHED, NOT_PUBLISHED};
use crate::http::{self, api};
use crate::landing_pages;
use crate::projects::{self, Project, ProjectChanges, ProjectStatus};
use crate::validation::{parse_body, CreateProjectRequest, PaginationQuery, UpdateProjectRequest};
use crate::BackendService;

#[post("/projects")]
pub async fn create_project(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let input = parse_body::<CreateProjectRequest>(&body)?.validate()?;
    let project = projects::create_project(service.store.as_ref(), &caller.user_id, input).await?;
    log::info!("User {} created project {}", &caller.user_id, &project.id);
    Ok(http::created(project))
}

#[get("/projects")]
pub async fn list_projects(
    req: HttpRequest,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let query: PaginationQuery = http::parse_query(&req)?;
    let limit = query.limit(projects::DEFAULT_PAGE_SIZE)?;
    let page = projects::list_projects(
        service.store.as_ref(),
        &caller.user_id,
        Some(limit),
        query.cursor(),
    )
    .await?;
    Ok(http::ok(page))
}

#[get("/projects/{project_id}")]
pub async fn get_project(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let project = api::load_project(&service, &caller, &path).await?;
    Ok(http::ok(project))
}

#[patch("/projects/{project_id}")]
pub async fn update_project(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let changes = parse_body::<UpdateProjectRequest>(&body)?.validate()?;
    let project =
        projects::update_project(service.store.as_ref(), &caller.user_id, &path, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(http::ok(project))
}

/// Succeeds whether or not the project exists.
#[delete("/projects/{project_id}")]
pub async fn delete_project(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    projects::delete_project(service.store.as_ref(), &caller.user_id, &path).await?;
    Ok(http::no_content())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    project: Project,
    url: String,
    published_at: String,
}

#[derive(Serialize)]
struct UnpublishResponse {
    project: Project,
}

#[post("/projects/{project_id}/publish")]
pub async fn publish_project(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let project = api::load_project(&service, &caller, &path).await?;
    if project.status == ProjectStatus::Published {
        return Err(ApiError::BadRequest {
            code: ALREADY_PUBLISHED,
            message: "Project is already published".to_string(),
        });
    }
    let landing_page = landing_pages::get_landing_page(service.store.as_ref(), &project.id)
        .await?
        .ok_or_else(|| {
            ApiError::bad_request("Project must have a landing page before publishing")
        })?;

    let published = service.publisher.publish(&project, &landing_page).await?;
    let changes = ProjectChanges {
        status: Some(ProjectStatus::Published),
        published_at: Some(published.published_at.clone()),
        ..Default::default()
    };
    let project =
        projects::update_project(service.store.as_ref(), &caller.user_id, &project.id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
    log::info!("Project {} published at {}", &project.id, &published.url);
    Ok(http::ok(PublishResponse {
        project,
        url: published.url,
        published_at: published.published_at,
    }))
}

#[post("/projects/{project_id}/unpublish")]
pub async fn unpublish_project(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let project = api::load_project(&service, &caller, &path).await?;
    if project.status != ProjectStatus::Published {
        return Err(ApiError::BadRequest {
            code: NOT_PUBLISHED,
            message: "Project is not published".to_string(),
        });
    }
    service.publisher.unpublish(&project).await?;
    let project = projects::update_project(
        service.store.as_ref(),
        &caller.user_id,
        &project.id,
        &ProjectChanges::status(ProjectStatus::Ready),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;
    log::info!("Project {} unpublished", &project.id);
    Ok(http::ok(UnpublishResponse { project }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;

    use crate::http;
    use crate::testing::fixtures;
    use crate::testing::{auth_header, default_backend_service, read_json};

    #[actix_web::test]
    async fn test_create_project_validation() {
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
                "description": "short",
                "targetAudience": "Testers",
                "problem": "Problem text here",
                "solution": "Solution text here"
            }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Validation failed");
        assert_eq!(
            body["error"]["details"]["description"],
            "Description must be at least 10 characters"
        );

        let request = TestRequest::post()
            .uri("/projects")
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(backend.store.is_empty());
    }

    #[actix_web::test]
    async fn test_requires_identity() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;

        let request = TestRequest::get().uri("/projects").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[actix_web::test]
    async fn test_list_get_update_delete() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(fixtures::create_project(backend.store.as_ref(), "u_1").await.id);
        }
        fixtures::create_project(backend.store.as_ref(), "u_2").await;

        let request = TestRequest::get()
            .uri("/projects?limit=2")
            .insert_header(auth_header("u_1"))
            .to_request();
        let body = read_json(test::call_service(&app, request).await).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
        let cursor = body["data"]["nextCursor"].as_str().unwrap().to_string();

        let url = reqwest::Url::parse_with_params(
            "http://localhost/projects",
            &[("limit", "2"), ("cursor", cursor.as_str())],
        )
        .unwrap();
        let request = TestRequest::get()
            .uri(&format!("/projects?{}", url.query().unwrap()))
            .insert_header(auth_header("u_1"))
            .to_request();
        let body = read_json(test::call_service(&app, request).await).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let request = TestRequest::get()
            .uri("/projects?limit=500")
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Another user's project is not found.
        let request = TestRequest::get()
            .uri(&format!("/projects/{}", ids[0]))
            .insert_header(auth_header("u_2"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = TestRequest::patch()
            .uri(&format!("/projects/{}", ids[0]))
            .insert_header(auth_header("u_1"))
            .set_json(json!({"name": "Renamed", "status": "archived"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["name"], "Renamed");
        assert_eq!(body["data"]["status"], "archived");

        let request = TestRequest::patch()
            .uri(&format!("/projects/{}", ids[0]))
            .insert_header(auth_header("u_1"))
            .set_json(json!({"status": "deleted"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = TestRequest::patch()
            .uri("/projects/p_missing")
            .insert_header(auth_header("u_1"))
            .set_json(json!({"name": "Renamed"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = TestRequest::get()
            .uri("/projects/u_1")
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"]["message"], "Project not found");

        for _ in 0..2 {
            let request = TestRequest::delete()
                .uri(&format!("/projects/{}", ids[0]))
                .insert_header(auth_header("u_1"))
                .to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }
        let request = TestRequest::get()
            .uri(&format!("/projects/{}", ids[0]))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_publish_and_unpublish() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let project = fixtures::create_project(backend.store.as_ref(), "u_1").await;
        fixtures::create_landing_page(backend.store.as_ref(), &project.id).await;

        let request = TestRequest::post()
            .uri(&format!("/projects/{}/unpublish", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_PUBLISHED");

        let request = TestRequest::post()
            .uri(&format!("/projects/{}/publish", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["project"]["status"], "published");
        assert_eq!(
            body["data"]["url"],
            format!("https://{}.maistro.test", project.slug)
        );
        assert_eq!(
            body["data"]["publishedAt"],
            body["data"]["project"]["publishedAt"]
        );
        assert_eq!(
            backend.storage.keys(),
            vec![
                format!("{}/index.html", project.slug),
                format!("{}/tracking.js", project.slug)
            ]
        );
        assert_eq!(backend.cdn.invalidations.lock().unwrap().len(), 1);

        let request = TestRequest::post()
            .uri(&format!("/projects/{}/publish", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "ALREADY_PUBLISHED");

        let request = TestRequest::post()
            .uri(&format!("/projects/{}/unpublish", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["project"]["status"], "ready");
        assert!(backend.storage.keys().is_empty());
        assert_eq!(backend.cdn.invalidations.lock().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_publish_missing_project() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let request = TestRequest::post()
            .uri("/projects/p_missing/publish")
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
