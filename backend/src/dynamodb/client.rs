use std::collections::HashMap;

use async_trait::async_trait;
use rusoto_core::RusotoError;
use rusoto_dynamodb::{
    AttributeValue, DeleteItemInput, DynamoDb, DynamoDbClient, GetItemInput, PutItemError,
    PutItemInput, QueryInput, UpdateItemError, UpdateItemInput,
};

use super::{
    Item, Key, Query, QueryPage, SortKeyCondition, Store, StoreError, StoreResult, Update,
    WriteCondition, GSI1_INDEX_NAME, PARTITION_KEY, SORT_KEY,
};

/// `Store` backed by a DynamoDB table.
pub struct DynamoStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// Collects `#name` and `:value` placeholders while an expression is being built.
#[derive(Default)]
struct Placeholders {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Placeholders {
    fn name(&mut self, name: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, n)| n.as_str() == name) {
            return placeholder.clone();
        }
        let placeholder = format!("#n{}", self.names.len());
        self.names.insert(placeholder.clone(), name.to_string());
        placeholder
    }

    fn path(&mut self, path: &[String]) -> String {
        path.iter()
            .map(|segment| self.name(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        if self.names.is_empty() {
            None
        } else {
            Some(self.names.clone())
        }
    }

    fn values(&self) -> Option<HashMap<String, AttributeValue>> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.clone())
        }
    }
}

fn s_value(s: &str) -> AttributeValue {
    AttributeValue {
        s: Some(s.to_string()),
        ..Default::default()
    }
}

fn n_value(n: i64) -> AttributeValue {
    AttributeValue {
        n: Some(n.to_string()),
        ..Default::default()
    }
}

fn condition_expression(condition: WriteCondition) -> String {
    match condition {
        WriteCondition::KeyNotExists => format!(
            "attribute_not_exists({}) AND attribute_not_exists({})",
            PARTITION_KEY, SORT_KEY
        ),
        WriteCondition::KeyExists => format!("attribute_exists({})", PARTITION_KEY),
    }
}

/// Renders `SET a = :v, b.c = if_not_exists(b.c, :zero) + :inc, ...`.
fn update_expression(update: &Update, placeholders: &mut Placeholders) -> String {
    let mut clauses = Vec::new();
    for (name, value) in update.set.iter() {
        let name = placeholders.name(name);
        let value = placeholders.value(value.clone());
        clauses.push(format!("{} = {}", name, value));
    }
    if !update.increments.is_empty() {
        let zero = placeholders.value(n_value(0));
        for increment in update.increments.iter() {
            let path = placeholders.path(&increment.path);
            let by = placeholders.value(n_value(increment.by));
            clauses.push(format!(
                "{} = if_not_exists({}, {}) + {}",
                path, path, zero, by
            ));
        }
    }
    format!("SET {}", clauses.join(", "))
}

fn query_input(table_name: &str, query: &Query, placeholders: &mut Placeholders) -> QueryInput {
    let (pk_name, sk_name) = match query.index.as_deref() {
        Some(GSI1_INDEX_NAME) => (
            dynamodb_schema::GSI1_PARTITION_KEY,
            dynamodb_schema::GSI1_SORT_KEY,
        ),
        _ => (PARTITION_KEY, SORT_KEY),
    };
    let pk = placeholders.name(pk_name);
    let pk_value = placeholders.value(s_value(&query.partition_key));
    let mut key_condition = format!("{} = {}", pk, pk_value);
    if let Some(sort_key) = query.sort_key.as_ref() {
        let sk = placeholders.name(sk_name);
        let clause = match sort_key {
            SortKeyCondition::Equals(value) => {
                format!("{} = {}", sk, placeholders.value(s_value(value)))
            }
            SortKeyCondition::BeginsWith(prefix) => {
                format!("begins_with({}, {})", sk, placeholders.value(s_value(prefix)))
            }
            SortKeyCondition::Between(start, end) => {
                let start = placeholders.value(s_value(start));
                let end = placeholders.value(s_value(end));
                format!("{} BETWEEN {} AND {}", sk, start, end)
            }
        };
        key_condition = format!("{} AND {}", key_condition, clause);
    }
    let filter_expression = query.filter.as_ref().map(|(name, value)| {
        let name = placeholders.name(name);
        let value = placeholders.value(value.clone());
        format!("{} = {}", name, value)
    });
    QueryInput {
        table_name: table_name.to_string(),
        index_name: query.index.clone(),
        key_condition_expression: Some(key_condition),
        filter_expression,
        limit: query.limit,
        scan_index_forward: Some(query.scan_forward),
        exclusive_start_key: query.exclusive_start_key.clone(),
        ..Default::default()
    }
}

fn non_empty(key: Option<Item>) -> Option<Item> {
    key.filter(|k| !k.is_empty())
}

#[async_trait]
impl Store for DynamoStore {
    async fn get_item(&self, key: &Key) -> StoreResult<Option<Item>> {
        let input = GetItemInput {
            table_name: self.table_name.clone(),
            key: key.to_item(),
            ..Default::default()
        };
        let output = self
            .client
            .get_item(input)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(output.item)
    }

    async fn put_item(&self, item: Item, condition: Option<WriteCondition>) -> StoreResult<()> {
        let input = PutItemInput {
            table_name: self.table_name.clone(),
            item,
            condition_expression: condition.map(condition_expression),
            ..Default::default()
        };
        match self.client.put_item(input).await {
            Ok(_) => Ok(()),
            Err(RusotoError::Service(PutItemError::ConditionalCheckFailed(_))) => {
                Err(StoreError::ConditionalCheckFailed)
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn update_item(&self, update: Update) -> StoreResult<Item> {
        let mut placeholders = Placeholders::default();
        let update_expression = update_expression(&update, &mut placeholders);
        let input = UpdateItemInput {
            table_name: self.table_name.clone(),
            key: update.key.to_item(),
            update_expression: Some(update_expression),
            condition_expression: update.condition.map(condition_expression),
            expression_attribute_names: placeholders.names(),
            expression_attribute_values: placeholders.values(),
            return_values: Some("ALL_NEW".to_string()),
            ..Default::default()
        };
        match self.client.update_item(input).await {
            Ok(output) => Ok(output.attributes.unwrap_or_default()),
            Err(RusotoError::Service(UpdateItemError::ConditionalCheckFailed(_))) => {
                Err(StoreError::ConditionalCheckFailed)
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn delete_item(&self, key: &Key) -> StoreResult<()> {
        let input = DeleteItemInput {
            table_name: self.table_name.clone(),
            key: key.to_item(),
            ..Default::default()
        };
        self.client
            .delete_item(input)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn query(&self, query: Query) -> StoreResult<QueryPage> {
        let mut placeholders = Placeholders::default();
        let mut input = query_input(&self.table_name, &query, &mut placeholders);
        input.expression_attribute_names = placeholders.names();
        input.expression_attribute_values = placeholders.values();
        let output = self
            .client
            .query(input)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(QueryPage {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: non_empty(output.last_evaluated_key),
        })
    }

    async fn count(&self, query: Query) -> StoreResult<i64> {
        let mut placeholders = Placeholders::default();
        let mut input = query_input(&self.table_name, &query, &mut placeholders);
        input.expression_attribute_names = placeholders.names();
        input.expression_attribute_values = placeholders.values();
        input.select = Some("COUNT".to_string());
        input.limit = None;

        let mut total = 0;
        loop {
            let output = self
                .client
                .query(input.clone())
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            total += output.count.unwrap_or(0);
            match non_empty(output.last_evaluated_key) {
                Some(key) => input.exclusive_start_key = Some(key),
                None => break,
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_expression_with_counters() -> StoreResult<()> {
        let update = Update::new(Key::new("PROJECT#p_1".to_string(), "STATS#2024-05-01".to_string()))
            .set("updatedAt", &"2024-05-01T00:00:00.000Z")?
            .increment(&["pageViews"], 1)
            .increment(&["deviceBreakdown", "mobile"], 1);
        let mut placeholders = Placeholders::default();
        let expression = update_expression(&update, &mut placeholders);
        assert_eq!(
            expression,
            "SET #n0 = :v0, #n1 = if_not_exists(#n1, :v1) + :v2, \
             #n2.#n3 = if_not_exists(#n2.#n3, :v1) + :v3"
        );
        let names = placeholders.names().unwrap();
        assert_eq!(names["#n0"], "updatedAt");
        assert_eq!(names["#n1"], "pageViews");
        assert_eq!(names["#n2"], "deviceBreakdown");
        assert_eq!(names["#n3"], "mobile");
        assert_eq!(placeholders.values().unwrap()[":v1"].n.as_deref(), Some("0"));
        Ok(())
    }

    #[test]
    fn test_query_input_on_gsi1() {
        let query = Query::gsi1("SLUG#demo-abc12345".to_string())
            .sort_key(SortKeyCondition::Equals("PROJECT".to_string()))
            .limit(1);
        let mut placeholders = Placeholders::default();
        let input = query_input("local-main", &query, &mut placeholders);
        assert_eq!(input.index_name.as_deref(), Some("GSI1"));
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("#n0 = :v0 AND #n1 = :v1")
        );
        let names = placeholders.names().unwrap();
        assert_eq!(names["#n0"], "GSI1PK");
        assert_eq!(names["#n1"], "GSI1SK");
        assert_eq!(input.limit, Some(1));
    }

    #[test]
    fn test_query_input_between_with_filter() {
        let query = Query::table("PROJECT#p_1".to_string())
            .sort_key(SortKeyCondition::Between(
                "STATS#2024-05-01".to_string(),
                "STATS#2024-05-31".to_string(),
            ))
            .filter_eq("type", "page_view");
        let mut placeholders = Placeholders::default();
        let input = query_input("local-main", &query, &mut placeholders);
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("#n0 = :v0 AND #n1 BETWEEN :v1 AND :v2")
        );
        assert_eq!(input.filter_expression.as_deref(), Some("#n2 = :v3"));
        assert_eq!(input.index_name, None);
        assert_eq!(input.scan_index_forward, Some(true));
    }

    #[test]
    fn test_condition_expressions() {
        assert_eq!(
            condition_expression(WriteCondition::KeyNotExists),
            "attribute_not_exists(PK) AND attribute_not_exists(SK)"
        );
        assert_eq!(
            condition_expression(WriteCondition::KeyExists),
            "attribute_exists(PK)"
        );
    }
}
