use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dynamodb_schema::{GSI1_PARTITION_KEY, GSI1_SORT_KEY};
use rusoto_dynamodb::AttributeValue;

use super::{
    av_get_s, Item, Key, Query, QueryPage, Store, StoreError, StoreResult, Update,
    WriteCondition, GSI1_INDEX_NAME, PARTITION_KEY, SORT_KEY,
};

/// `Store` that keeps the table in memory. Mirrors the DynamoDB behavior the rest of the crate
/// relies on: conditional writes, atomic counters, ALL_NEW update results, sort-key ordering,
/// GSI1 lookups, `Limit` applied before filters, and `LastEvaluatedKey` pagination.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<Key, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in the table.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<Key, Item>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_condition(existing: Option<&Item>, condition: Option<WriteCondition>) -> StoreResult<()> {
    match (condition, existing) {
        (Some(WriteCondition::KeyNotExists), Some(_)) => Err(StoreError::ConditionalCheckFailed),
        (Some(WriteCondition::KeyExists), None) => Err(StoreError::ConditionalCheckFailed),
        _ => Ok(()),
    }
}

fn number(value: Option<&AttributeValue>) -> StoreResult<i64> {
    match value {
        None => Ok(0),
        Some(value) => value
            .n
            .as_ref()
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| StoreError::Backend("An operand in the update expression has an incorrect data type".to_string())),
    }
}

fn apply_increment(item: &mut Item, path: &[String], by: i64) -> StoreResult<()> {
    let invalid_path =
        || StoreError::Backend("The document path provided in the update expression is invalid for update".to_string());
    let (leaf, parents) = path.split_last().ok_or_else(invalid_path)?;
    let mut target: &mut Item = item;
    for parent in parents {
        target = target
            .get_mut(parent)
            .and_then(|value| value.m.as_mut())
            .ok_or_else(invalid_path)?;
    }
    let current = number(target.get(leaf))?;
    target.insert(
        leaf.clone(),
        AttributeValue {
            n: Some((current + by).to_string()),
            ..Default::default()
        },
    );
    Ok(())
}

/// Position of an item within the queried index.
fn index_position(item: &Item, on_gsi1: bool) -> Option<(String, String, String)> {
    let pk = av_get_s(item, PARTITION_KEY)?.to_string();
    let sk = av_get_s(item, SORT_KEY)?.to_string();
    let index_sk = if on_gsi1 {
        av_get_s(item, GSI1_SORT_KEY)?.to_string()
    } else {
        sk.clone()
    };
    Some((index_sk, pk, sk))
}

fn last_evaluated_key(item: &Item, on_gsi1: bool) -> Item {
    let mut names = vec![PARTITION_KEY, SORT_KEY];
    if on_gsi1 {
        names.push(GSI1_PARTITION_KEY);
        names.push(GSI1_SORT_KEY);
    }
    names
        .into_iter()
        .filter_map(|name| Some((name.to_string(), item.get(name)?.clone())))
        .collect()
}

impl MemoryStore {
    /// Items matched by the key condition, in index order, after the exclusive start key.
    fn evaluate(&self, query: &Query) -> StoreResult<Vec<Item>> {
        let on_gsi1 = match query.index.as_deref() {
            None => false,
            Some(GSI1_INDEX_NAME) => true,
            Some(other) => {
                return Err(StoreError::Backend(format!(
                    "The table does not have the specified index: {}",
                    other
                )))
            }
        };
        let (pk_name, sk_name) = if on_gsi1 {
            (GSI1_PARTITION_KEY, GSI1_SORT_KEY)
        } else {
            (PARTITION_KEY, SORT_KEY)
        };

        let mut matched: Vec<((String, String, String), Item)> = self
            .lock()
            .values()
            .filter(|item| av_get_s(item, pk_name) == Some(query.partition_key.as_str()))
            .filter(|item| match (query.sort_key.as_ref(), av_get_s(item, sk_name)) {
                (None, Some(_)) => true,
                (Some(condition), Some(sk)) => condition.matches(sk),
                (_, None) => false,
            })
            .filter_map(|item| Some((index_position(item, on_gsi1)?, item.clone())))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        if !query.scan_forward {
            matched.reverse();
        }

        if let Some(start_key) = query.exclusive_start_key.as_ref() {
            let start = index_position(start_key, on_gsi1).ok_or(StoreError::InvalidCursor)?;
            matched.retain(|(position, _)| {
                if query.scan_forward {
                    *position > start
                } else {
                    *position < start
                }
            });
        }

        Ok(matched.into_iter().map(|(_, item)| item).collect())
    }
}

fn passes_filter(item: &Item, filter: Option<&(String, AttributeValue)>) -> bool {
    match filter {
        Some((name, value)) => item.get(name) == Some(value),
        None => true,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_item(&self, key: &Key) -> StoreResult<Option<Item>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put_item(&self, item: Item, condition: Option<WriteCondition>) -> StoreResult<()> {
        let key = Key::from_item(&item)
            .ok_or_else(|| StoreError::Backend("Item is missing its key attributes".to_string()))?;
        let mut items = self.lock();
        check_condition(items.get(&key), condition)?;
        items.insert(key, item);
        Ok(())
    }

    async fn update_item(&self, update: Update) -> StoreResult<Item> {
        let mut items = self.lock();
        let existing = items.get(&update.key);
        check_condition(existing, update.condition)?;

        // Work on a copy so a failed increment leaves the stored item untouched.
        let mut item = existing.cloned().unwrap_or_else(|| update.key.to_item());
        for (name, value) in update.set.into_iter() {
            item.insert(name, value);
        }
        for increment in update.increments.iter() {
            apply_increment(&mut item, &increment.path, increment.by)?;
        }
        items.insert(update.key, item.clone());
        Ok(item)
    }

    async fn delete_item(&self, key: &Key) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn query(&self, query: Query) -> StoreResult<QueryPage> {
        let on_gsi1 = query.index.is_some();
        let mut evaluated = self.evaluate(&query)?;
        let mut last_key = None;
        if let Some(limit) = query.limit {
            let limit = limit.max(0) as usize;
            if evaluated.len() > limit {
                evaluated.truncate(limit);
                last_key = evaluated.last().map(|item| last_evaluated_key(item, on_gsi1));
            }
        }
        let items = evaluated
            .into_iter()
            .filter(|item| passes_filter(item, query.filter.as_ref()))
            .collect();
        Ok(QueryPage {
            items,
            last_evaluated_key: last_key,
        })
    }

    async fn count(&self, query: Query) -> StoreResult<i64> {
        let evaluated = self.evaluate(&query)?;
        Ok(evaluated
            .iter()
            .filter(|item| passes_filter(item, query.filter.as_ref()))
            .count() as i64)
    }
}
