use serde::{Deserialize, Serialize};

use crate::dynamodb::keys::{self, USER_ENTITY, USER_GSI1SK};
use crate::dynamodb::{
    entity_item, from_item, update_existing, Query, SortKeyCondition, Store, StoreResult, Update,
    WriteCondition,
};
use crate::ids::{new_id, IdType};
use crate::utils::time;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub plan: Plan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Fields left as `None` are not touched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip)]
    pub plan: Option<Plan>,
    #[serde(skip)]
    pub stripe_customer_id: Option<String>,
}

/// Creates a user on the free plan. Fails with `ConditionalCheckFailed` if the key is taken.
pub async fn create_user(store: &dyn Store, input: NewUser) -> StoreResult<User> {
    let timestamp = time::now_iso_str();
    let user = User {
        id: new_id(IdType::User),
        email: input.email,
        name: input.name,
        avatar_url: input.avatar_url,
        plan: Plan::Free,
        stripe_customer_id: None,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    let item = entity_item(
        &user,
        &keys::user_key(&user.id),
        Some((keys::user_gsi1pk(&user.email).as_str(), USER_GSI1SK)),
        USER_ENTITY,
    )?;
    store
        .put_item(item, Some(WriteCondition::KeyNotExists))
        .await?;
    Ok(user)
}

pub async fn get_user_by_id(store: &dyn Store, user_id: &str) -> StoreResult<Option<User>> {
    match store.get_item(&keys::user_key(user_id)).await? {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

pub async fn get_user_by_email(store: &dyn Store, email: &str) -> StoreResult<Option<User>> {
    let query = Query::gsi1(keys::user_gsi1pk(email))
        .sort_key(SortKeyCondition::Equals(USER_GSI1SK.to_string()))
        .limit(1);
    let page = store.query(query).await?;
    match page.items.into_iter().next() {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

pub async fn update_user(
    store: &dyn Store,
    user_id: &str,
    changes: &UserChanges,
) -> StoreResult<Option<User>> {
    let update = Update::new(keys::user_key(user_id))
        .set("updatedAt", &time::now_iso_str())?
        .set_opt("name", changes.name.as_ref())?
        .set_opt("avatarUrl", changes.avatar_url.as_ref())?
        .set_opt("plan", changes.plan.as_ref())?
        .set_opt("stripeCustomerId", changes.stripe_customer_id.as_ref())?;
    match update_existing(store, update).await? {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

pub async fn delete_user(store: &dyn Store, user_id: &str) -> StoreResult<()> {
    store.delete_item(&keys::user_key(user_id)).await
}
