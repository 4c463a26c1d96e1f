use serde::{Deserialize, Serialize};

use crate::dynamodb::keys::{self, PROJECT_ENTITY, PROJECT_GSI1SK, PROJECT_PREFIX};
use crate::dynamodb::{
    decode_optional_cursor, entity_item, from_item, update_existing, Page, Query,
    SortKeyCondition, Store, StoreResult, Update, WriteCondition,
};
use crate::ids::{new_id, IdType};
use crate::utils::{slug, time};

pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Attempts at finding an unused slug before giving up.
const SLUG_ATTEMPTS: usize = 3;

/// Nominally `draft -> generating -> ready -> published -> (archived | ready)`. Any status may
/// be written directly.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Generating,
    Ready,
    Published,
    Archived,
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProjectStatus::Draft),
            "generating" => Some(ProjectStatus::Generating),
            "ready" => Some(ProjectStatus::Ready),
            "published" => Some(ProjectStatus::Published),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub target_audience: String,
    pub problem: String,
    pub solution: String,
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub target_audience: String,
    pub problem: String,
    pub solution: String,
}

/// Fields left as `None` are not touched.
#[derive(Clone, Debug, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub status: Option<ProjectStatus>,
    pub published_at: Option<String>,
}

impl ProjectChanges {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Creates a draft project with a fresh slug.
pub async fn create_project(
    store: &dyn Store,
    user_id: &str,
    input: NewProject,
) -> StoreResult<Project> {
    let mut slug = slug::create_unique_slug(&input.name);
    for _ in 1..SLUG_ATTEMPTS {
        if get_project_by_slug(store, &slug).await?.is_none() {
            break;
        }
        log::warn!("Slug {} is taken. Trying another one.", &slug);
        slug = slug::create_unique_slug(&input.name);
    }

    let timestamp = time::now_iso_str();
    let project = Project {
        id: new_id(IdType::Project),
        user_id: user_id.to_string(),
        name: input.name,
        slug,
        description: input.description,
        target_audience: input.target_audience,
        problem: input.problem,
        solution: input.solution,
        status: ProjectStatus::Draft,
        published_at: None,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    let item = entity_item(
        &project,
        &keys::project_key(user_id, &project.id),
        Some((keys::project_gsi1pk(&project.slug).as_str(), PROJECT_GSI1SK)),
        PROJECT_ENTITY,
    )?;
    store
        .put_item(item, Some(WriteCondition::KeyNotExists))
        .await?;
    Ok(project)
}

pub async fn get_project(
    store: &dyn Store,
    user_id: &str,
    project_id: &str,
) -> StoreResult<Option<Project>> {
    match store.get_item(&keys::project_key(user_id, project_id)).await? {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

pub async fn get_project_by_slug(store: &dyn Store, slug: &str) -> StoreResult<Option<Project>> {
    let query = Query::gsi1(keys::project_gsi1pk(slug))
        .sort_key(SortKeyCondition::Equals(PROJECT_GSI1SK.to_string()))
        .limit(1);
    let page = store.query(query).await?;
    match page.items.into_iter().next() {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

/// Most recently created first. `cursor` comes from a previous page.
pub async fn list_projects(
    store: &dyn Store,
    user_id: &str,
    limit: Option<i64>,
    cursor: Option<&str>,
) -> StoreResult<Page<Project>> {
    let query = Query::table(keys::user_pk(user_id))
        .sort_key(SortKeyCondition::BeginsWith(PROJECT_PREFIX.to_string()))
        .limit(limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .newest_first()
        .start_after(decode_optional_cursor(cursor)?);
    Page::from_query_page(store.query(query).await?)
}

/// Applies the changes to an existing project. Moving to `published` stamps `publishedAt`
/// unless the caller supplies one.
pub async fn update_project(
    store: &dyn Store,
    user_id: &str,
    project_id: &str,
    changes: &ProjectChanges,
) -> StoreResult<Option<Project>> {
    let published_at = match (changes.status, changes.published_at.as_ref()) {
        (_, Some(published_at)) => Some(published_at.clone()),
        (Some(ProjectStatus::Published), None) => Some(time::now_iso_str()),
        _ => None,
    };
    let update = Update::new(keys::project_key(user_id, project_id))
        .set("updatedAt", &time::now_iso_str())?
        .set_opt("name", changes.name.as_ref())?
        .set_opt("description", changes.description.as_ref())?
        .set_opt("targetAudience", changes.target_audience.as_ref())?
        .set_opt("problem", changes.problem.as_ref())?
        .set_opt("solution", changes.solution.as_ref())?
        .set_opt("status", changes.status.as_ref())?
        .set_opt("publishedAt", published_at.as_ref())?;
    match update_existing(store, update).await? {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

/// Deletes only the project item. Its landing page, signups, events and stats stay.
pub async fn delete_project(store: &dyn Store, user_id: &str, project_id: &str) -> StoreResult<()> {
    store
        .delete_item(&keys::project_key(user_id, project_id))
        .await
}
