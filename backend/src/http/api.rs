//! Routes for signed-in users.

pub mod analytics;
pub mod events;
pub mod ideas;
pub mod landing_pages;
pub mod projects;
pub mod signups;
pub mod users;

use crate::error::{ApiError, ApiResult};
use crate::http::Caller;
use crate::ids::{Id, IdType};
use crate::projects::{self as project_store, Project};
use crate::BackendService;

/// The caller's project, or 404. Strings that are not project ids never reach the store.
pub async fn load_project(
    service: &BackendService,
    caller: &Caller,
    project_id: &str,
) -> ApiResult<Project> {
    if Id::parse(project_id).map(|id| id.id_type) != Some(IdType::Project) {
        return Err(ApiError::not_found("Project not found"));
    }
    project_store::get_project(service.store.as_ref(), &caller.user_id, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}
