use crate::dynamodb::Store;
use crate::landing_pages::{self, LandingPage};
use crate::projects::{self, NewProject, Project, ProjectChanges, ProjectStatus};
use crate::users::{self, NewUser, User};

/// A reply the scripted model can give for landing page generation.
pub const LANDING_PAGE_REPLY: &str = r#"{
    "headline": "Walks, handled",
    "subheadline": "Vetted walkers near you, booked in a minute",
    "sections": [
        {"type": "features", "content": {"items": [
            {"title": "Vetted", "description": "Every walker is checked", "icon": "shield"}
        ]}},
        {"type": "faq", "content": {"items": [
            {"question": "Is it insured?", "answer": "Yes"}
        ]}}
    ],
    "ctaText": "Join the waitlist",
    "seoTitle": "Dog Walkr",
    "seoDescription": "Dog walking on demand"
}"#;

pub fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: "A test project description".to_string(),
        target_audience: "Testers".to_string(),
        problem: "Problem text here".to_string(),
        solution: "Solution text here".to_string(),
    }
}

pub async fn create_user(store: &dyn Store, email: &str, name: &str) -> User {
    users::create_user(
        store,
        NewUser {
            email: email.to_string(),
            name: name.to_string(),
            avatar_url: None,
        },
    )
    .await
    .unwrap()
}

pub async fn create_project(store: &dyn Store, user_id: &str) -> Project {
    projects::create_project(store, user_id, new_project("Demo"))
        .await
        .unwrap()
}

pub async fn create_landing_page(store: &dyn Store, project_id: &str) -> LandingPage {
    landing_pages::create_landing_page(store, landing_pages::tests::new_landing_page(project_id))
        .await
        .unwrap()
}

/// A project with a landing page, marked published. Nothing is uploaded.
pub async fn create_published_project(store: &dyn Store, user_id: &str) -> Project {
    let project = create_project(store, user_id).await;
    create_landing_page(store, &project.id).await;
    projects::update_project(
        store,
        user_id,
        &project.id,
        &ProjectChanges::status(ProjectStatus::Published),
    )
    .await
    .unwrap()
    .unwrap()
}
