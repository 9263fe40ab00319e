//! Document store abstraction

use crate::domain::{
    AzLearnError, ContainerSpec, DeleteResponse, DocumentId, ItemResponse, PartitionKeyValue,
    PatchOperation, QueryPage, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

/// A database of partitioned JSON containers
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the database if needed; returns `true` if it was created
    async fn ensure_database(&self) -> Result<bool>;

    /// Creates the container if needed and returns a handle to it
    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<Arc<dyn DocumentContainer>>;
}

/// Item operations on one container
///
/// Documents are addressed by `(id, partition key)`. Every call reports the
/// request charge it was billed.
#[async_trait]
pub trait DocumentContainer: Send + Sync {
    /// The container definition
    fn spec(&self) -> &ContainerSpec;

    /// Inserts a new document
    ///
    /// # Errors
    ///
    /// - `Validation` if `id` or the partition key is missing or empty, or
    ///   `ttl` is neither positive nor `-1`
    /// - `Conflict` if a live document with the same `(id, partition key)`
    ///   exists
    async fn create(&self, document: &Value) -> Result<ItemResponse<Value>>;

    /// Returns one page of the documents in `partition_key`, ordered
    /// ascending by the top-level property `order_by`
    async fn query_page(
        &self,
        partition_key: &PartitionKeyValue,
        order_by: &str,
        continuation: Option<String>,
    ) -> Result<QueryPage<Value>>;

    /// Reads a document; `NotFound` if absent or expired
    async fn read(&self, id: &DocumentId, partition_key: &PartitionKeyValue)
        -> Result<ItemResponse<Value>>;

    /// Replaces the document with the same `(id, partition key)` or inserts it
    async fn upsert(&self, document: &Value) -> Result<ItemResponse<Value>>;

    /// Applies `operations` in order, all or nothing
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty list, too many operations, or a path on
    ///   `/id` or the partition key
    /// - `NotFound` if the document is absent
    /// - `PreconditionFailed` when a path's parent, a `Remove`/`Replace`
    ///   target, or an array index does not exist
    async fn patch(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
        operations: &[PatchOperation],
    ) -> Result<ItemResponse<Value>>;

    /// Deletes a document; `NotFound` if absent
    async fn delete(&self, id: &DocumentId, partition_key: &PartitionKeyValue)
        -> Result<DeleteResponse>;
}

/// Lazily fetches every page of a partition query
///
/// The stream ends after the page without a continuation, or after the
/// first error.
pub fn query_pages<'a>(
    container: &'a dyn DocumentContainer,
    partition_key: &'a PartitionKeyValue,
    order_by: &'a str,
) -> BoxStream<'a, Result<QueryPage<Value>>> {
    // State: None = finished, Some(token) = next page to fetch
    stream::unfold(Some(None::<String>), move |state| async move {
        let continuation = state?;
        match container.query_page(partition_key, order_by, continuation).await {
            Ok(page) => {
                let next = page.continuation.clone().map(Some);
                Some((Ok(page), next))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

/// Checks an order-by property name before it is placed in a query
pub fn validate_order_by(order_by: &str) -> Result<()> {
    let mut chars = order_by.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AzLearnError::Validation(format!(
            "Order-by property '{order_by}' must be a plain top-level property name"
        )))
    }
}

/// Encodes a result offset as an opaque continuation token
pub fn encode_continuation(offset: usize) -> String {
    URL_SAFE_NO_PAD.encode(format!("offset:{offset}"))
}

/// Decodes a token produced by [`encode_continuation`]
pub fn decode_continuation(token: &str) -> Result<usize> {
    let invalid = || AzLearnError::Validation(format!("Invalid continuation token '{token}'"));
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.strip_prefix("offset:")
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)
}

/// Validates the fields every write needs and returns `(id, partition key)`
pub fn document_key(document: &Value, spec: &ContainerSpec) -> Result<(String, String)> {
    let id = match document.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        _ => {
            return Err(AzLearnError::Validation(
                "Document must have a non-empty string 'id'".to_string(),
            ))
        }
    };

    let pk_property = spec.partition_key_property();
    let partition_key = match document.get(pk_property) {
        Some(Value::String(pk)) if !pk.trim().is_empty() => pk.clone(),
        _ => {
            return Err(AzLearnError::Validation(format!(
                "Document must have a non-empty partition key '{}'",
                spec.partition_key_path
            )))
        }
    };

    match document.get("ttl") {
        None | Some(Value::Null) => {}
        Some(ttl) => match ttl.as_i64() {
            Some(t) if t > 0 || t == -1 => {}
            _ => {
                return Err(AzLearnError::Validation(format!(
                    "Document ttl must be a positive integer or -1, got {ttl}"
                )))
            }
        },
    }

    Ok((id, partition_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TtlSetting;
    use serde_json::json;
    use test_case::test_case;

    fn spec() -> ContainerSpec {
        ContainerSpec::new("PhoneStatusInfo", "/phone", TtlSetting::NoDefault).unwrap()
    }

    #[test]
    fn test_continuation_round_trip() {
        let token = encode_continuation(200);
        assert_eq!(decode_continuation(&token).unwrap(), 200);
        assert!(decode_continuation("garbage!").is_err());
    }

    #[test_case("createDate", true)]
    #[test_case("_ts", true)]
    #[test_case("c.phone", false)]
    #[test_case("1abc", false)]
    #[test_case("", false)]
    fn test_validate_order_by(field: &str, ok: bool) {
        assert_eq!(validate_order_by(field).is_ok(), ok);
    }

    #[test_case(json!({"id": "a", "phone": "1"}), true)]
    #[test_case(json!({"id": "", "phone": "1"}), false)]
    #[test_case(json!({"phone": "1"}), false)]
    #[test_case(json!({"id": "a"}), false)]
    #[test_case(json!({"id": "a", "phone": "1", "ttl": 120}), true)]
    #[test_case(json!({"id": "a", "phone": "1", "ttl": -1}), true)]
    #[test_case(json!({"id": "a", "phone": "1", "ttl": 0}), false)]
    #[test_case(json!({"id": "a", "phone": "1", "ttl": -5}), false)]
    fn test_document_key(document: Value, ok: bool) {
        assert_eq!(document_key(&document, &spec()).is_ok(), ok);
    }
}
