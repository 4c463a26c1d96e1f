use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::ApiResult;
use crate::http::{self, api};
use crate::signups::{self, Signup};
use crate::validation::PaginationQuery;
use crate::BackendService;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupList {
    items: Vec<Signup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_cursor: Option<String>,
    /// All signups of the project, not only this page.
    total: i64,
}

#[get("/projects/{project_id}/signups")]
pub async fn list_signups(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<BackendService>,
) -> ApiResult<HttpResponse> {
    let caller = http::get_caller(&req)?;
    let query: PaginationQuery = http::parse_query(&req)?;
    let limit = query.limit(signups::DEFAULT_PAGE_SIZE)?;
    let project = api::load_project(&service, &caller, &path).await?;
    let store = service.store.as_ref();
    let (page, total) = futures::try_join!(
        signups::list_signups(store, &project.id, Some(limit), query.cursor()),
        signups::count_signups(store, &project.id),
    )?;
    Ok(http::ok(SignupList {
        items: page.items,
        next_cursor: page.next_cursor,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;

    use crate::http;
    use crate::signups::{self, NewSignup};
    use crate::testing::fixtures;
    use crate::testing::{auth_header, default_backend_service, read_json};

    fn new_signup(project_id: &str, email: &str) -> NewSignup {
        NewSignup {
            project_id: project_id.to_string(),
            email: email.to_string(),
            name: None,
            source: None,
            referrer: None,
            user_agent: None,
            ip_address: None,
            metadata: None,
        }
    }

    #[actix_web::test]
    async fn test_list_signups() {
        let backend = default_backend_service();
        let app = test::init_service(
            App::new()
                .app_data(backend.service.clone())
                .configure(http::configure),
        )
        .await;
        let project = fixtures::create_project(backend.store.as_ref(), "u_1").await;
        for i in 0..3 {
            signups::create_signup(
                backend.store.as_ref(),
                new_signup(&project.id, &format!("user{}@example.com", i)),
            )
            .await
            .unwrap();
        }

        let request = TestRequest::get()
            .uri(&format!("/projects/{}/signups?limit=2", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["total"], 3);
        assert!(body["data"]["nextCursor"].is_string());

        // Another user's project is invisible.
        let request = TestRequest::get()
            .uri(&format!("/projects/{}/signups", project.id))
            .insert_header(auth_header("u_2"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = TestRequest::get()
            .uri(&format!("/projects/{}/signups?limit=0", project.id))
            .insert_header(auth_header("u_1"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
