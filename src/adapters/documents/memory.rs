//! In-process document store
//!
//! Keeps the observable behavior of the service that the walkthrough relies
//! on: `(id, partition key)` addressing, conflicts, expiry measured from the
//! last write, ordered paged queries, in-order atomic patches, and a request
//! charge on every call. The charges are a rough model, not the service's
//! real pricing.

use super::traits::{
    decode_continuation, document_key, encode_continuation, validate_order_by, DocumentContainer,
    DocumentStore,
};
use crate::adapters::clock::{Clock, SystemClock};
use crate::domain::{
    patch, AzLearnError, ContainerSpec, DeleteResponse, DocumentId, ErrorKind, ItemResponse,
    PartitionKeyValue, PatchOperation, QueryPage, RequestCharge, RequestError, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const READ_CHARGE: f64 = 1.0;
const WRITE_BASE_CHARGE: f64 = 5.0;
const QUERY_BASE_CHARGE: f64 = 2.5;
const QUERY_ITEM_CHARGE: f64 = 0.1;
const PATCH_OP_CHARGE: f64 = 0.5;

/// Default number of items per query page
pub const DEFAULT_PAGE_SIZE: usize = 100;

fn write_charge(document: &Value) -> RequestCharge {
    let kib = document.to_string().len() as f64 / 1024.0;
    RequestCharge::new(WRITE_BASE_CHARGE + kib.ceil())
}

/// Document store kept in memory
pub struct MemoryDocumentStore {
    database: String,
    database_exists: RwLock<bool>,
    containers: RwLock<HashMap<String, Arc<MemoryContainer>>>,
    clock: Arc<dyn Clock>,
    page_size: usize,
}

impl MemoryDocumentStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self::with_clock(database, Arc::new(SystemClock))
    }

    pub fn with_clock(database: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            database: database.into(),
            database_exists: RwLock::new(false),
            containers: RwLock::new(HashMap::new()),
            clock,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the number of items per query page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_database(&self) -> Result<bool> {
        let mut exists = self.database_exists.write().await;
        if *exists {
            tracing::debug!(database = %self.database, "Database already exists");
            return Ok(false);
        }
        *exists = true;
        Ok(true)
    }

    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<Arc<dyn DocumentContainer>> {
        if !*self.database_exists.read().await {
            return Err(AzLearnError::not_found(format!(
                "Database '{}' does not exist",
                self.database
            )));
        }

        let mut containers = self.containers.write().await;
        let container: Arc<dyn DocumentContainer> = containers
            .entry(spec.id.clone())
            .or_insert_with(|| {
                Arc::new(MemoryContainer {
                    spec: spec.clone(),
                    items: RwLock::new(HashMap::new()),
                    clock: Arc::clone(&self.clock),
                    page_size: self.page_size,
                })
            })
            .clone();
        Ok(container)
    }
}

#[derive(Debug, Clone)]
struct StoredItem {
    body: Value,
    last_write: DateTime<Utc>,
}

/// `(partition key, id)`
type ItemKey = (String, String);

/// One container of [`MemoryDocumentStore`]
pub struct MemoryContainer {
    spec: ContainerSpec,
    items: RwLock<HashMap<ItemKey, StoredItem>>,
    clock: Arc<dyn Clock>,
    page_size: usize,
}

impl MemoryContainer {
    fn is_expired(&self, item: &StoredItem, now: DateTime<Utc>) -> bool {
        let ttl = item.body.get("ttl").and_then(Value::as_i64);
        match self.spec.default_ttl.effective_ttl(ttl) {
            Some(seconds) => now >= item.last_write + Duration::seconds(seconds),
            None => false,
        }
    }

    /// Live item at `key`, dropping it first if it has expired
    fn live<'a>(
        &self,
        items: &'a mut HashMap<ItemKey, StoredItem>,
        key: &ItemKey,
        now: DateTime<Utc>,
    ) -> Option<&'a mut StoredItem> {
        if items.get(key).is_some_and(|item| self.is_expired(item, now)) {
            items.remove(key);
        }
        items.get_mut(key)
    }

    fn stamp(body: &mut Value, now: DateTime<Utc>) {
        if let Value::Object(map) = body {
            map.insert("_ts".to_string(), Value::from(now.timestamp()));
            map.insert(
                "_etag".to_string(),
                Value::from(format!("\"{}\"", uuid::Uuid::new_v4())),
            );
        }
    }

    fn not_found(id: &str, partition_key: &str) -> AzLearnError {
        RequestError::new(
            ErrorKind::NotFound,
            format!("Document '{id}' not found in partition '{partition_key}'"),
        )
        .with_charge(READ_CHARGE)
        .into()
    }
}

/// Orders JSON values the way the query engine does for mixed types:
/// missing/null, then booleans, numbers, and strings
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentContainer for MemoryContainer {
    fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    async fn create(&self, document: &Value) -> Result<ItemResponse<Value>> {
        let (id, partition_key) = document_key(document, &self.spec)?;
        let now = self.clock.now();
        let key = (partition_key.clone(), id.clone());

        let mut items = self.items.write().await;
        if self.live(&mut items, &key, now).is_some() {
            return Err(RequestError::new(
                ErrorKind::Conflict,
                format!("Document '{id}' already exists in partition '{partition_key}'"),
            )
            .with_charge(READ_CHARGE)
            .into());
        }

        let mut body = document.clone();
        Self::stamp(&mut body, now);
        let charge = write_charge(&body);
        items.insert(
            key,
            StoredItem {
                body: body.clone(),
                last_write: now,
            },
        );
        Ok(ItemResponse::new(body, charge, 201))
    }

    async fn query_page(
        &self,
        partition_key: &PartitionKeyValue,
        order_by: &str,
        continuation: Option<String>,
    ) -> Result<QueryPage<Value>> {
        validate_order_by(order_by)?;
        let offset = continuation
            .as_deref()
            .map(decode_continuation)
            .transpose()?
            .unwrap_or(0);
        let now = self.clock.now();

        let items = self.items.read().await;
        let mut matching: Vec<&StoredItem> = items
            .iter()
            .filter(|((pk, _), item)| pk == partition_key.as_str() && !self.is_expired(item, now))
            .map(|(_, item)| item)
            .collect();
        // Ties keep a stable order through the id
        matching.sort_by(|a, b| {
            compare_values(a.body.get(order_by), b.body.get(order_by))
                .then_with(|| compare_values(a.body.get("id"), b.body.get("id")))
        });

        let page: Vec<Value> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|item| item.body.clone())
            .collect();
        let next_offset = offset + page.len();
        let continuation = (next_offset < matching.len()).then(|| encode_continuation(next_offset));
        let charge = QUERY_BASE_CHARGE + QUERY_ITEM_CHARGE * page.len() as f64;

        Ok(QueryPage {
            items: page,
            request_charge: RequestCharge::new(charge),
            continuation,
        })
    }

    async fn read(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
    ) -> Result<ItemResponse<Value>> {
        let now = self.clock.now();
        let key = (partition_key.as_str().to_string(), id.as_str().to_string());

        let mut items = self.items.write().await;
        match self.live(&mut items, &key, now) {
            Some(item) => Ok(ItemResponse::new(
                item.body.clone(),
                RequestCharge::new(READ_CHARGE),
                200,
            )),
            None => Err(Self::not_found(id.as_str(), partition_key.as_str())),
        }
    }

    async fn upsert(&self, document: &Value) -> Result<ItemResponse<Value>> {
        let (id, partition_key) = document_key(document, &self.spec)?;
        let now = self.clock.now();
        let key = (partition_key, id);

        let mut items = self.items.write().await;
        let replaced = self.live(&mut items, &key, now).is_some();

        let mut body = document.clone();
        Self::stamp(&mut body, now);
        let charge = write_charge(&body);
        items.insert(
            key,
            StoredItem {
                body: body.clone(),
                last_write: now,
            },
        );
        Ok(ItemResponse::new(body, charge, if replaced { 200 } else { 201 }))
    }

    async fn patch(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
        operations: &[PatchOperation],
    ) -> Result<ItemResponse<Value>> {
        patch::validate(operations, &self.spec.partition_key_path)?;
        let now = self.clock.now();
        let key = (partition_key.as_str().to_string(), id.as_str().to_string());

        let mut items = self.items.write().await;
        let item = self
            .live(&mut items, &key, now)
            .ok_or_else(|| Self::not_found(id.as_str(), partition_key.as_str()))?;

        let mut body = item.body.clone();
        patch::apply(&mut body, operations, &self.spec.partition_key_path)?;
        Self::stamp(&mut body, now);

        let charge = write_charge(&body).value() + PATCH_OP_CHARGE * operations.len() as f64;
        item.body = body.clone();
        item.last_write = now;
        Ok(ItemResponse::new(body, RequestCharge::new(charge), 200))
    }

    async fn delete(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
    ) -> Result<DeleteResponse> {
        let now = self.clock.now();
        let key = (partition_key.as_str().to_string(), id.as_str().to_string());

        let mut items = self.items.write().await;
        if self.live(&mut items, &key, now).is_none() {
            return Err(Self::not_found(id.as_str(), partition_key.as_str()));
        }
        items.remove(&key);
        Ok(DeleteResponse {
            request_charge: RequestCharge::new(WRITE_BASE_CHARGE),
            status_code: 204,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::domain::TtlSetting;
    use serde_json::json;

    async fn container(clock: Arc<ManualClock>, page_size: usize) -> Arc<dyn DocumentContainer> {
        let store = MemoryDocumentStore::with_clock("CARE", clock).with_page_size(page_size);
        store.ensure_database().await.unwrap();
        let spec = ContainerSpec::new("PhoneStatusInfo", "/phone", TtlSetting::NoDefault).unwrap();
        store.ensure_container(&spec).await.unwrap()
    }

    fn ids(id: &str, pk: &str) -> (DocumentId, PartitionKeyValue) {
        (DocumentId::new(id).unwrap(), PartitionKeyValue::new(pk).unwrap())
    }

    #[tokio::test]
    async fn test_container_requires_database() {
        let store = MemoryDocumentStore::new("CARE");
        let spec = ContainerSpec::new("c", "/phone", TtlSetting::Off).unwrap();
        assert!(store.ensure_container(&spec).await.err().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_create_conflict_and_read() {
        let c = container(Arc::new(ManualClock::default()), 10).await;
        let doc = json!({"id": "a", "phone": "1", "lineOfBiz": "Biz-A"});

        let created = c.create(&doc).await.unwrap();
        assert_eq!(created.status_code, 201);
        assert!(created.request_charge.value() > 0.0);

        let err = c.create(&doc).await.unwrap_err();
        assert!(err.is_conflict());

        let (id, pk) = ids("a", "1");
        let read = c.read(&id, &pk).await.unwrap();
        assert_eq!(read.resource["lineOfBiz"], "Biz-A");
    }

    #[tokio::test]
    async fn test_same_id_in_other_partition_is_distinct() {
        let c = container(Arc::new(ManualClock::default()), 10).await;
        c.create(&json!({"id": "a", "phone": "1"})).await.unwrap();
        c.create(&json!({"id": "a", "phone": "2"})).await.unwrap();

        let (id, pk) = ids("a", "3");
        assert!(c.read(&id, &pk).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_expiry_counts_from_last_write() {
        let clock = Arc::new(ManualClock::default());
        let c = container(Arc::clone(&clock), 10).await;
        c.create(&json!({"id": "x", "phone": "6268889999", "ttl": 120}))
            .await
            .unwrap();
        let (id, pk) = ids("x", "6268889999");

        clock.advance(Duration::seconds(100));
        let ops = vec![PatchOperation::set("/comment", "touched").unwrap()];
        c.patch(&id, &pk, &ops).await.unwrap();

        clock.advance(Duration::seconds(100));
        assert!(c.read(&id, &pk).await.is_ok());

        clock.advance(Duration::seconds(20));
        assert!(c.read(&id, &pk).await.unwrap_err().is_not_found());
        assert!(c.delete(&id, &pk).await.unwrap_err().is_not_found());

        // The id is free again once expired
        c.create(&json!({"id": "x", "phone": "6268889999"})).await.unwrap();
    }

    #[tokio::test]
    async fn test_ttl_ignored_when_container_expiry_off() {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryDocumentStore::with_clock("CARE", Arc::clone(&clock) as Arc<dyn Clock>);
        store.ensure_database().await.unwrap();
        let spec = ContainerSpec::new("c", "/phone", TtlSetting::Off).unwrap();
        let c = store.ensure_container(&spec).await.unwrap();

        c.create(&json!({"id": "x", "phone": "1", "ttl": 1})).await.unwrap();
        clock.advance(Duration::seconds(10));
        let (id, pk) = ids("x", "1");
        assert!(c.read(&id, &pk).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_orders_and_pages() {
        let c = container(Arc::new(ManualClock::default()), 2).await;
        for (id, date) in [("c", "2024-01-03"), ("a", "2024-01-01"), ("b", "2024-01-02")] {
            c.create(&json!({"id": id, "phone": "1", "createDate": date}))
                .await
                .unwrap();
        }
        c.create(&json!({"id": "z", "phone": "2", "createDate": "2023-01-01"}))
            .await
            .unwrap();

        let pk = PartitionKeyValue::new("1").unwrap();
        let first = c.query_page(&pk, "createDate", None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0]["id"], "a");
        assert!(first.has_more());

        let second = c
            .query_page(&pk, "createDate", first.continuation.clone())
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0]["id"], "c");
        assert!(!second.has_more());
    }

    #[tokio::test]
    async fn test_patch_is_atomic() {
        let c = container(Arc::new(ManualClock::default()), 10).await;
        c.create(&json!({"id": "a", "phone": "1", "status": 2, "history": []}))
            .await
            .unwrap();
        let (id, pk) = ids("a", "1");

        let ops = vec![
            PatchOperation::set("/status", 1).unwrap(),
            PatchOperation::remove("/history/3"),
        ];
        let err = c.patch(&id, &pk, &ops).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PreconditionFailed));

        let read = c.read(&id, &pk).await.unwrap();
        assert_eq!(read.resource["status"], 2);
    }

    #[tokio::test]
    async fn test_patch_missing_document() {
        let c = container(Arc::new(ManualClock::default()), 10).await;
        let (id, pk) = ids("nope", "1");
        let ops = vec![PatchOperation::set("/status", 1).unwrap()];
        assert!(c.patch(&id, &pk, &ops).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_document() {
        let c = container(Arc::new(ManualClock::default()), 10).await;
        c.create(&json!({"id": "a", "phone": "1", "history": [{"status": 2}]}))
            .await
            .unwrap();

        let replaced = c
            .upsert(&json!({"id": "a", "phone": "1", "history": []}))
            .await
            .unwrap();
        assert_eq!(replaced.status_code, 200);
        assert_eq!(replaced.resource["history"], json!([]));
    }
}
