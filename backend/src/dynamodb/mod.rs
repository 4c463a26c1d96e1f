//! Access to the single DynamoDB table.
//!
//! Entity modules never talk to DynamoDB directly. They build `Key`, `Update` and `Query` values
//! and hand them to a `Store`. There are two stores: `DynamoStore`, backed by rusoto, and
//! `MemoryStore`, an in-process table used in tests and in local development.

use std::collections::HashMap;

use async_trait::async_trait;
use rusoto_dynamodb::AttributeValue;
use serde::Serialize;
use thiserror::Error;

pub mod client;
pub mod cursor;
pub mod keys;
pub mod memory;

pub use client::DynamoStore;
pub use cursor::{decode_optional_cursor, Page};
pub use memory::MemoryStore;

pub use dynamodb_schema::{GSI1_INDEX_NAME, PARTITION_KEY, SORT_KEY};

/// A DynamoDB item.
pub type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conditional check failed")]
    ConditionalCheckFailed,
    #[error("dynamodb request failed: {0}")]
    Backend(String),
    #[error("malformed item: {0}")]
    Malformed(#[from] serde_dynamo::Error),
    #[error("invalid pagination cursor")]
    InvalidCursor,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Primary key of an item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub pk: String,
    pub sk: String,
}

impl Key {
    pub fn new(pk: String, sk: String) -> Self {
        Self { pk, sk }
    }

    pub fn to_item(&self) -> Item {
        av_map(&[av_s(PARTITION_KEY, &self.pk), av_s(SORT_KEY, &self.sk)])
    }

    pub fn from_item(item: &Item) -> Option<Self> {
        Some(Self {
            pk: av_get_s(item, PARTITION_KEY)?.to_string(),
            sk: av_get_s(item, SORT_KEY)?.to_string(),
        })
    }
}

/// Condition attached to a single-item write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteCondition {
    /// `attribute_not_exists(PK) AND attribute_not_exists(SK)`
    KeyNotExists,
    /// `attribute_exists(PK)`
    KeyExists,
}

/// Atomic counter increment. `path` addresses a number, possibly nested inside map attributes,
/// eg. `["deviceBreakdown", "mobile"]`. Missing leaf counters start from zero, but parent maps
/// must already exist.
#[derive(Clone, Debug, PartialEq)]
pub struct Increment {
    pub path: Vec<String>,
    pub by: i64,
}

/// A partial update of one item, applied atomically. Returns the whole new item.
#[derive(Clone, Debug)]
pub struct Update {
    pub key: Key,
    pub set: Vec<(String, AttributeValue)>,
    pub increments: Vec<Increment>,
    pub condition: Option<WriteCondition>,
}

impl Update {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            set: Vec::new(),
            increments: Vec::new(),
            condition: None,
        }
    }

    /// Sets `name` to the serialized form of `value`.
    pub fn set<T: Serialize>(mut self, name: &str, value: &T) -> StoreResult<Self> {
        self.set.push((name.to_string(), to_attribute_value(value)?));
        Ok(self)
    }

    /// Sets `name` only if the value is present. Absent fields are left untouched.
    pub fn set_opt<T: Serialize>(self, name: &str, value: Option<&T>) -> StoreResult<Self> {
        match value {
            Some(value) => self.set(name, value),
            None => Ok(self),
        }
    }

    pub fn increment(mut self, path: &[&str], by: i64) -> Self {
        self.increments.push(Increment {
            path: path.iter().map(|s| s.to_string()).collect(),
            by,
        });
        self
    }

    pub fn with_condition(mut self, condition: WriteCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn sets(&self, name: &str) -> bool {
        self.set.iter().any(|(n, _)| n == name)
    }
}

/// Condition on the sort key of a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortKeyCondition {
    Equals(String),
    BeginsWith(String),
    Between(String, String),
}

impl SortKeyCondition {
    pub fn matches(&self, sort_key: &str) -> bool {
        match self {
            SortKeyCondition::Equals(value) => sort_key == value,
            SortKeyCondition::BeginsWith(prefix) => sort_key.starts_with(prefix.as_str()),
            SortKeyCondition::Between(start, end) => {
                sort_key >= start.as_str() && sort_key <= end.as_str()
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Query {
    /// `None` queries the table itself, `Some(GSI1_INDEX_NAME)` queries GSI1.
    pub index: Option<String>,
    pub partition_key: String,
    pub sort_key: Option<SortKeyCondition>,
    pub limit: Option<i64>,
    pub scan_forward: bool,
    pub exclusive_start_key: Option<Item>,
    /// Equality filter on a non-key attribute. Applied after `limit`, like DynamoDB does.
    pub filter: Option<(String, AttributeValue)>,
}

impl Query {
    pub fn table(partition_key: String) -> Self {
        Self {
            index: None,
            partition_key,
            sort_key: None,
            limit: None,
            scan_forward: true,
            exclusive_start_key: None,
            filter: None,
        }
    }

    pub fn gsi1(partition_key: String) -> Self {
        Self {
            index: Some(GSI1_INDEX_NAME.to_string()),
            ..Self::table(partition_key)
        }
    }

    pub fn sort_key(mut self, condition: SortKeyCondition) -> Self {
        self.sort_key = Some(condition);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn start_after(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }

    pub fn filter_eq(mut self, name: &str, value: &str) -> Self {
        self.filter = Some((
            name.to_string(),
            AttributeValue {
                s: Some(value.to_string()),
                ..Default::default()
            },
        ));
        self
    }
}

/// One page of query results. `last_evaluated_key` is set when more items may follow.
#[derive(Clone, Debug, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

/// Single-item operations against the table. Every write is atomic on its own item only.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_item(&self, key: &Key) -> StoreResult<Option<Item>>;

    async fn put_item(&self, item: Item, condition: Option<WriteCondition>) -> StoreResult<()>;

    /// Applies the update and returns the new item. A failed condition is
    /// `StoreError::ConditionalCheckFailed`.
    async fn update_item(&self, update: Update) -> StoreResult<Item>;

    /// Deleting a missing item succeeds.
    async fn delete_item(&self, key: &Key) -> StoreResult<()>;

    async fn query(&self, query: Query) -> StoreResult<QueryPage>;

    /// Counts matching items without returning them, following every page.
    async fn count(&self, query: Query) -> StoreResult<i64>;
}

/// Applies an update to an item that must already exist. A missing item is `None`.
pub async fn update_existing(store: &dyn Store, update: Update) -> StoreResult<Option<Item>> {
    match store
        .update_item(update.with_condition(WriteCondition::KeyExists))
        .await
    {
        Ok(item) => Ok(Some(item)),
        Err(StoreError::ConditionalCheckFailed) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Shorthand to create `AttributeValue` entry with string type `S`.
pub fn av_s(key: &str, value: &str) -> (String, AttributeValue) {
    (
        key.to_string(),
        AttributeValue {
            s: Some(value.to_string()),
            ..Default::default()
        },
    )
}

/// Shorthand to create `AttributeValue` entry with number type `N`.
pub fn av_n(key: &str, number: i64) -> (String, AttributeValue) {
    (
        key.to_string(),
        AttributeValue {
            n: Some(number.to_string()),
            ..Default::default()
        },
    )
}

/// Shorthand. Turn an array of `AttributeValue` entries into a hash map.
///
/// eg.
/// ```ignore
/// let key = av_map(&[
///     av_s("PK", "USER#u_123"),
///     av_s("SK", "PROFILE"),
/// ]);
/// ```
pub fn av_map(arr: &[(String, AttributeValue)]) -> Item {
    arr.iter().cloned().collect()
}

/// Shorthand. Retrieve the `S` string value for a given key in a Dynamo item.
pub fn av_get_s<'a>(item: &'a Item, key: &str) -> Option<&'a str> {
    Some(item.get(key)?.s.as_ref()?.as_str())
}

/// Shorthand. Retrieve the `N` value for a given key in a Dynamo item, and parse as an i64.
pub fn av_get_n(item: &Item, key: &str) -> Option<i64> {
    item.get(key)?.n.as_ref()?.parse::<i64>().ok()
}

pub fn to_item<T: Serialize>(value: &T) -> StoreResult<Item> {
    Ok(serde_dynamo::rusoto_dynamodb_0_48::to_item(value)?)
}

pub fn from_item<T: serde::de::DeserializeOwned>(item: Item) -> StoreResult<T> {
    Ok(serde_dynamo::rusoto_dynamodb_0_48::from_item(item)?)
}

pub fn to_attribute_value<T: Serialize>(value: &T) -> StoreResult<AttributeValue> {
    Ok(serde_dynamo::rusoto_dynamodb_0_48::to_attribute_value(
        value,
    )?)
}

/// Serializes an entity and adds its keys and `entityType` discriminator.
pub fn entity_item<T: Serialize>(
    entity: &T,
    key: &Key,
    gsi1: Option<(&str, &str)>,
    entity_type: &str,
) -> StoreResult<Item> {
    let mut item = to_item(entity)?;
    item.extend(key.to_item());
    if let Some((gsi1pk, gsi1sk)) = gsi1 {
        item.extend(av_map(&[
            av_s(dynamodb_schema::GSI1_PARTITION_KEY, gsi1pk),
            av_s(dynamodb_schema::GSI1_SORT_KEY, gsi1sk),
        ]));
    }
    item.extend(av_map(&[av_s(keys::ENTITY_TYPE, entity_type)]));
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_conditions() {
        let eq = SortKeyCondition::Equals("PROFILE".to_string());
        assert!(eq.matches("PROFILE"));
        assert!(!eq.matches("PROFILE2"));

        let prefix = SortKeyCondition::BeginsWith("SIGNUP#".to_string());
        assert!(prefix.matches("SIGNUP#2024-01-01T00:00:00.000Z#s_1"));
        assert!(!prefix.matches("EVENT#2024-01-01T00:00:00.000Z#e_1"));

        let between =
            SortKeyCondition::Between("STATS#2024-01-01".to_string(), "STATS#2024-01-31".to_string());
        assert!(between.matches("STATS#2024-01-01"));
        assert!(between.matches("STATS#2024-01-15"));
        assert!(between.matches("STATS#2024-01-31"));
        assert!(!between.matches("STATS#2024-02-01"));
    }

    #[test]
    fn test_update_skips_absent_fields() -> StoreResult<()> {
        let key = Key::new("USER#u_1".to_string(), "PROFILE".to_string());
        let name: Option<&String> = None;
        let update = Update::new(key)
            .set_opt("name", name)?
            .set("updatedAt", &"2024-01-01T00:00:00.000Z")?;
        assert!(!update.sets("name"));
        assert!(update.sets("updatedAt"));
        Ok(())
    }

    #[test]
    fn test_entity_item_carries_keys() -> StoreResult<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Thing {
            display_name: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            avatar_url: Option<String>,
        }
        let thing = Thing {
            display_name: "Ada".to_string(),
            avatar_url: None,
        };
        let key = Key::new("USER#u_1".to_string(), "PROFILE".to_string());
        let item = entity_item(&thing, &key, Some(("EMAIL#a@b.co", "USER")), "USER")?;
        assert_eq!(av_get_s(&item, "PK"), Some("USER#u_1"));
        assert_eq!(av_get_s(&item, "SK"), Some("PROFILE"));
        assert_eq!(av_get_s(&item, "GSI1PK"), Some("EMAIL#a@b.co"));
        assert_eq!(av_get_s(&item, "entityType"), Some("USER"));
        assert_eq!(av_get_s(&item, "displayName"), Some("Ada"));
        assert!(!item.contains_key("avatarUrl"));
        Ok(())
    }
}
