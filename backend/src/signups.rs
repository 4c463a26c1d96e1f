use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dynamodb::keys::{self, SIGNUP_ENTITY, SIGNUP_PREFIX};
use crate::dynamodb::{
    decode_optional_cursor, entity_item, Page, Query, SortKeyCondition, Store, StoreResult,
};
use crate::ids::{new_id, IdType};
use crate::utils::time;

pub const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Signup {
    pub id: String,
    pub project_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub created_at: String,
}

#[derive(Clone, Debug, Default)]
pub struct NewSignup {
    pub project_id: String,
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// Signups are append-only. The same email may sign up more than once.
pub async fn create_signup(store: &dyn Store, input: NewSignup) -> StoreResult<Signup> {
    let signup = Signup {
        id: new_id(IdType::Signup),
        project_id: input.project_id,
        email: input.email,
        name: non_empty(input.name),
        source: non_empty(input.source),
        referrer: non_empty(input.referrer),
        user_agent: non_empty(input.user_agent),
        ip_address: non_empty(input.ip_address),
        metadata: input.metadata.filter(|m| !m.is_empty()),
        created_at: time::now_iso_str(),
    };
    let item = entity_item(
        &signup,
        &keys::signup_key(&signup.project_id, &signup.created_at, &signup.id),
        None,
        SIGNUP_ENTITY,
    )?;
    store.put_item(item, None).await?;
    Ok(signup)
}

/// Newest first.
pub async fn list_signups(
    store: &dyn Store,
    project_id: &str,
    limit: Option<i64>,
    cursor: Option<&str>,
) -> StoreResult<Page<Signup>> {
    let query = signups_query(project_id)
        .limit(limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .newest_first()
        .start_after(decode_optional_cursor(cursor)?);
    Page::from_query_page(store.query(query).await?)
}

pub async fn count_signups(store: &dyn Store, project_id: &str) -> StoreResult<i64> {
    store.count(signups_query(project_id)).await
}

fn signups_query(project_id: &str) -> Query {
    Query::table(keys::project_pk(project_id))
        .sort_key(SortKeyCondition::BeginsWith(SIGNUP_PREFIX.to_string()))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::dynamodb::{av_get_s, MemoryStore};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn new_signup(project_id: &str, email: &str) -> NewSignup {
        NewSignup {
            project_id: project_id.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_signup() -> TestResult {
        let store = MemoryStore::new();
        let metadata = json!({"plan": "pro"}).as_object().cloned();
        let signup = create_signup(
            &store,
            NewSignup {
                name: Some("Ada".to_string()),
                source: Some(String::new()),
                metadata,
                ..new_signup("p_1", "ada@example.com")
            },
        )
        .await?;
        assert!(signup.id.starts_with("s_"));
        assert_eq!(signup.name.as_deref(), Some("Ada"));
        assert_eq!(signup.source, None);
        assert_eq!(
            signup.metadata.as_ref().and_then(|m| m.get("plan")),
            Some(&json!("pro"))
        );

        let key = keys::signup_key("p_1", &signup.created_at, &signup.id);
        let item = store.get_item(&key).await?.unwrap();
        assert_eq!(av_get_s(&item, "entityType"), Some("SIGNUP"));
        assert!(!item.contains_key("source"));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_count_signups() -> TestResult {
        let store = MemoryStore::new();
        for i in 0..5 {
            create_signup(&store, new_signup("p_1", &format!("user{}@example.com", i))).await?;
        }
        // Duplicates are allowed.
        create_signup(&store, new_signup("p_1", "user0@example.com")).await?;
        create_signup(&store, new_signup("p_2", "other@example.com")).await?;

        assert_eq!(count_signups(&store, "p_1").await?, 6);
        assert_eq!(count_signups(&store, "p_2").await?, 1);
        assert_eq!(count_signups(&store, "p_3").await?, 0);

        let first = list_signups(&store, "p_1", Some(4), None).await?;
        assert_eq!(first.items.len(), 4);
        for pair in first.items.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        let cursor = first.next_cursor.clone().unwrap();
        let second = list_signups(&store, "p_1", Some(4), Some(&cursor)).await?;
        assert_eq!(second.items.len(), 2);
        assert!(second.next_cursor.is_none());
        assert!(second.items.iter().all(|s| s.project_id == "p_1"));
        Ok(())
    }
}
