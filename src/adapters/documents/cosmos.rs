//! Cosmos DB document store
//!
//! Built on `azure_data_cosmos` with key authentication.

use super::traits::{
    decode_continuation, document_key, encode_continuation, validate_order_by, DocumentContainer,
    DocumentStore,
};
use crate::config::{expose_str, CosmosConnection};
use crate::domain::{
    patch, AzLearnError, ContainerSpec, DeleteResponse, DocumentId, ItemResponse,
    PartitionKeyValue, PatchOperation, QueryPage, RequestCharge, RequestError, Result,
};
use async_trait::async_trait;
use azure_core::credentials::Secret;
use azure_core::http::headers::{HeaderName, Headers};
use azure_data_cosmos::clients::{ContainerClient, DatabaseClient};
use azure_data_cosmos::models::{ContainerProperties, PatchDocument};
use azure_data_cosmos::{CosmosClient, CosmosClientOptions, PartitionKey};
use futures::stream::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

const REQUEST_CHARGE: HeaderName = HeaderName::from_static("x-ms-request-charge");

/// Request charge reported in the response headers
fn charge_of(headers: &Headers) -> RequestCharge {
    headers
        .get_optional_str(&REQUEST_CHARGE)
        .and_then(|v| v.parse::<f64>().ok())
        .map(RequestCharge::new)
        .unwrap_or_default()
}

/// HTTP status of a failed call
///
/// Taken from the error kind when the SDK reports a response, otherwise
/// recovered from the error text.
fn status_of(err: &azure_core::Error) -> u16 {
    err.http_status()
        .map(u16::from)
        .unwrap_or_else(|| status_from_message(&err.to_string()))
}

/// Status named by the earliest whole status token in `message`
///
/// Tokens are split on anything but ASCII letters and digits, so ids and
/// GUIDs that merely contain `404` never match.
fn status_from_message(message: &str) -> u16 {
    const KNOWN: [(u16, &[&str]); 8] = [
        (404, &["404", "NotFound"]),
        (409, &["409", "Conflict"]),
        (412, &["412", "PreconditionFailed"]),
        (429, &["429", "TooManyRequests"]),
        (401, &["401", "Unauthorized"]),
        (403, &["403", "Forbidden"]),
        (503, &["503", "ServiceUnavailable"]),
        (400, &["400", "BadRequest"]),
    ];
    let by_token = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|token| {
            KNOWN
                .iter()
                .find(|(_, names)| names.contains(&token))
                .map(|(status, _)| *status)
        });
    match by_token {
        Some(status) => status,
        None if message.contains("Request rate is large") => 429,
        None => 500,
    }
}

fn request_error(operation: &str, err: azure_core::Error) -> AzLearnError {
    let status = status_of(&err);
    RequestError::from_status(status, format!("{operation}: {err}")).into()
}

/// Document store backed by a Cosmos DB account
pub struct CosmosDocumentStore {
    client: CosmosClient,
    database: DatabaseClient,
    database_name: String,
    page_size: usize,
}

impl CosmosDocumentStore {
    /// Connects to the account with key authentication
    ///
    /// # Errors
    ///
    /// Returns a connection error if the client cannot be created
    pub fn new(
        connection: &CosmosConnection,
        database_name: &str,
        page_size: usize,
    ) -> Result<Self> {
        let key = Secret::new(expose_str(&connection.key).to_string());
        let options = Some(CosmosClientOptions::default());

        let client = CosmosClient::with_key(&connection.endpoint, key, options).map_err(|e| {
            AzLearnError::Connection(format!("Failed to create Cosmos client: {e}"))
        })?;
        let database = client.database_client(database_name);

        Ok(Self {
            client,
            database,
            database_name: database_name.to_string(),
            page_size: page_size.max(1),
        })
    }
}

#[async_trait]
impl DocumentStore for CosmosDocumentStore {
    async fn ensure_database(&self) -> Result<bool> {
        match self.database.read(None).await {
            Ok(_) => {
                tracing::debug!(database = %self.database_name, "Database already exists");
                Ok(false)
            }
            Err(e) if status_of(&e) == 404 => {
                tracing::info!(database = %self.database_name, "Creating database");
                self.client
                    .create_database(&self.database_name, None)
                    .await
                    .map_err(|e| request_error("create database", e))?;
                Ok(true)
            }
            Err(e) => Err(request_error("read database", e)),
        }
    }

    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<Arc<dyn DocumentContainer>> {
        let container = self.database.container_client(&spec.id);

        match container.read(None).await {
            Ok(_) => {
                tracing::debug!(container = %spec.id, "Container already exists");
            }
            Err(e) if status_of(&e) == 404 => {
                tracing::info!(
                    container = %spec.id,
                    partition_key = %spec.partition_key_path,
                    default_ttl = %spec.default_ttl,
                    "Creating container"
                );
                let mut definition = json!({
                    "id": spec.id,
                    "partitionKey": {"paths": [spec.partition_key_path], "kind": "Hash"},
                });
                if let Some(ttl) = spec.default_ttl.as_raw() {
                    definition["defaultTtl"] = json!(ttl);
                }
                let properties: ContainerProperties = serde_json::from_value(definition)?;

                self.database
                    .create_container(properties, None)
                    .await
                    .map_err(|e| request_error("create container", e))?;
            }
            Err(e) => return Err(request_error("read container", e)),
        }

        Ok(Arc::new(CosmosContainer {
            container,
            spec: spec.clone(),
            page_size: self.page_size,
        }))
    }
}

/// One container of [`CosmosDocumentStore`]
pub struct CosmosContainer {
    container: ContainerClient,
    spec: ContainerSpec,
    page_size: usize,
}

#[async_trait]
impl DocumentContainer for CosmosContainer {
    fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    async fn create(&self, document: &Value) -> Result<ItemResponse<Value>> {
        let (_, partition_key) = document_key(document, &self.spec)?;
        let response = self
            .container
            .create_item(PartitionKey::from(partition_key), document.clone(), None)
            .await
            .map_err(|e| request_error("create item", e))?;

        Ok(ItemResponse::new(
            document.clone(),
            charge_of(response.headers()),
            201,
        ))
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

        // One extra item tells whether another page follows
        let query = format!(
            "SELECT * FROM c ORDER BY c.{order_by} ASC OFFSET {offset} LIMIT {}",
            self.page_size + 1
        );
        let mut pager = self
            .container
            .query_items::<Value>(
                query,
                PartitionKey::from(partition_key.as_str().to_string()),
                None,
            )
            .map_err(|e| request_error("query items", e))?;

        let mut items = Vec::with_capacity(self.page_size + 1);
        while let Some(item) = pager.next().await {
            items.push(item.map_err(|e| request_error("query items", e))?);
        }

        let continuation = (items.len() > self.page_size).then(|| {
            items.truncate(self.page_size);
            encode_continuation(offset + self.page_size)
        });

        // Item streams do not expose per-page headers
        Ok(QueryPage {
            items,
            request_charge: RequestCharge::ZERO,
            continuation,
        })
    }

    async fn read(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
    ) -> Result<ItemResponse<Value>> {
        let response = self
            .container
            .read_item::<Value>(
                PartitionKey::from(partition_key.as_str().to_string()),
                id.as_str(),
                None,
            )
            .await
            .map_err(|e| request_error("read item", e))?;

        let charge = charge_of(response.headers());
        let resource = response.into_body().map_err(|e| {
            AzLearnError::Serialization(format!("Failed to parse item {id}: {e}"))
        })?;
        Ok(ItemResponse::new(resource, charge, 200))
    }

    async fn upsert(&self, document: &Value) -> Result<ItemResponse<Value>> {
        let (_, partition_key) = document_key(document, &self.spec)?;
        let response = self
            .container
            .upsert_item(PartitionKey::from(partition_key), document.clone(), None)
            .await
            .map_err(|e| request_error("upsert item", e))?;

        Ok(ItemResponse::new(
            document.clone(),
            charge_of(response.headers()),
            200,
        ))
    }

    async fn patch(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
        operations: &[PatchOperation],
    ) -> Result<ItemResponse<Value>> {
        patch::validate(operations, &self.spec.partition_key_path)?;
        let document: PatchDocument =
            serde_json::from_value(json!({ "operations": operations }))?;

        let response = self
            .container
            .patch_item(
                PartitionKey::from(partition_key.as_str().to_string()),
                id.as_str(),
                document,
                None,
            )
            .await
            .map_err(|e| request_error("patch item", e))?;
        let patch_charge = charge_of(response.headers());

        // The patch response carries no body; read the result back
        let read = self.read(id, partition_key).await?;
        Ok(ItemResponse::new(
            read.resource,
            patch_charge + read.request_charge,
            200,
        ))
    }

    async fn delete(
        &self,
        id: &DocumentId,
        partition_key: &PartitionKeyValue,
    ) -> Result<DeleteResponse> {
        let response = self
            .container
            .delete_item(
                PartitionKey::from(partition_key.as_str().to_string()),
                id.as_str(),
                None,
            )
            .await
            .map_err(|e| request_error("delete item", e))?;

        Ok(DeleteResponse {
            request_charge: charge_of(response.headers()),
            status_code: 204,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("HttpError: 404 NotFound: Resource Not Found", 404)]
    #[test_case("Entity with the specified id already exists (409)", 409)]
    #[test_case(
        "HttpError: 409 Conflict: Entity exists, ActivityId: 7c2a4040-5e1d-4040-9404-a40412c0ffee",
        409 ; "conflict with 404 inside the activity id"
    )]
    #[test_case(
        "TooManyRequests, ActivityId: 404a0b1c-0000-4040-8000-000000000404",
        429 ; "throttled with 404 inside the activity id"
    )]
    #[test_case("Request rate is large", 429)]
    #[test_case("PartitionKey 14045 not found", 500 ; "number containing 404")]
    #[test_case("something odd", 500)]
    fn test_status_from_message(message: &str, status: u16) {
        assert_eq!(status_from_message(message), status);
    }

    #[test]
    fn test_patch_document_accepts_operations() {
        let ops = vec![
            PatchOperation::set("/status", 1).unwrap(),
            PatchOperation::add("/history/0", json!({"status": 1})).unwrap(),
            PatchOperation::remove("/history/1"),
        ];
        let document: std::result::Result<PatchDocument, _> =
            serde_json::from_value(json!({ "operations": ops }));
        assert!(document.is_ok());
    }
}
