//! Opaque pagination cursors.
//!
//! A cursor is the base64 encoding of the JSON form of DynamoDB's `LastEvaluatedKey`, eg.
//! `{"PK":"USER#u_1","SK":"PROJECT#p_2"}`. Clients hand it back unchanged. Nothing outside this
//! module looks inside one.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rusoto_dynamodb::AttributeValue;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{from_item, Item, QueryPage, StoreError, StoreResult};

/// A page of entities, newest first, and the cursor for the next page if there is one.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T: DeserializeOwned> Page<T> {
    pub fn from_query_page(page: QueryPage) -> StoreResult<Self> {
        let items = page
            .items
            .into_iter()
            .map(from_item)
            .collect::<StoreResult<Vec<T>>>()?;
        let next_cursor = page
            .last_evaluated_key
            .as_ref()
            .map(encode_cursor)
            .transpose()?;
        Ok(Self { items, next_cursor })
    }
}

pub fn encode_cursor(last_evaluated_key: &Item) -> StoreResult<String> {
    // Key attributes are always strings. BTreeMap keeps the JSON stable.
    let mut fields = BTreeMap::new();
    for (name, value) in last_evaluated_key.iter() {
        let s = value.s.as_ref().ok_or(StoreError::InvalidCursor)?;
        fields.insert(name.as_str(), s.as_str());
    }
    let json = serde_json::to_vec(&fields).map_err(|_| StoreError::InvalidCursor)?;
    Ok(STANDARD.encode(json))
}

pub fn decode_cursor(cursor: &str) -> StoreResult<Item> {
    let json = STANDARD
        .decode(cursor.trim())
        .map_err(|_| StoreError::InvalidCursor)?;
    let fields: BTreeMap<String, String> =
        serde_json::from_slice(&json).map_err(|_| StoreError::InvalidCursor)?;
    if fields.is_empty() {
        return Err(StoreError::InvalidCursor);
    }
    Ok(fields
        .into_iter()
        .map(|(name, value)| {
            (
                name,
                AttributeValue {
                    s: Some(value),
                    ..Default::default()
                },
            )
        })
        .collect())
}

/// Decodes an optional cursor from a request.
pub fn decode_optional_cursor(cursor: Option<&str>) -> StoreResult<Option<Item>> {
    match cursor {
        Some(cursor) if !cursor.is_empty() => Ok(Some(decode_cursor(cursor)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamodb::{av_get_s, av_map, av_s};

    #[test]
    fn test_cursor_is_base64_json_of_key() -> StoreResult<()> {
        let key = av_map(&[av_s("PK", "USER#u_1"), av_s("SK", "PROJECT#p_2")]);
        let cursor = encode_cursor(&key)?;
        let json = STANDARD.decode(&cursor).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"PK":"USER#u_1","SK":"PROJECT#p_2"}"#
        );

        let decoded = decode_cursor(&cursor)?;
        assert_eq!(av_get_s(&decoded, "PK"), Some("USER#u_1"));
        assert_eq!(av_get_s(&decoded, "SK"), Some("PROJECT#p_2"));
        Ok(())
    }

    #[test]
    fn test_invalid_cursors() {
        assert!(matches!(
            decode_cursor("not base64!!"),
            Err(StoreError::InvalidCursor)
        ));
        let not_json = STANDARD.encode("hello");
        assert!(matches!(
            decode_cursor(&not_json),
            Err(StoreError::InvalidCursor)
        ));
        let empty = STANDARD.encode("{}");
        assert!(matches!(
            decode_cursor(&empty),
            Err(StoreError::InvalidCursor)
        ));
    }

    #[test]
    fn test_missing_cursor() -> StoreResult<()> {
        assert!(decode_optional_cursor(None)?.is_none());
        assert!(decode_optional_cursor(Some(""))?.is_none());
        Ok(())
    }
}
