//! Blob Storage walkthrough
//!
//! Uploads a small JSON message, shows that a second upload without the
//! overwrite flag is rejected, overwrites it, then replaces its HTTP headers
//! and metadata.

use crate::adapters::clock::{Clock, SystemClock};
use crate::adapters::storage::ObjectStore;
use crate::config::StorageConfig;
use crate::core::cancel::cancellable;
use crate::domain::{BlobHttpHeaders, BlobMessage, BlobMetadata, BlobProperties, Result};
use crate::{log_operation_failed, log_step};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Text of the uploaded message
pub const MESSAGE_TEXT: &str = "this is a test json object";

/// Metadata written by the last step
pub fn demo_metadata() -> BlobMetadata {
    let mut metadata = BlobMetadata::new();
    metadata.insert("docType".to_string(), "textDocuments".to_string());
    metadata.insert("category".to_string(), "guidance".to_string());
    metadata.insert("docSid".to_string(), "DOC202503030001".to_string());
    metadata
}

/// Headers written by the header step, keeping the other existing headers
pub fn demo_headers(existing: &BlobHttpHeaders) -> BlobHttpHeaders {
    BlobHttpHeaders {
        // Must be sent every time or the service clears it
        content_type: Some("text/plain".to_string()),
        content_language: Some("en-us".to_string()),
        cache_control: existing.cache_control.clone(),
        content_disposition: existing.content_disposition.clone(),
        content_encoding: existing.content_encoding.clone(),
        content_hash: existing.content_hash.clone(),
    }
}

/// Outcome of a blob walkthrough
#[derive(Debug, Clone, Default)]
pub struct BlobWorkflowSummary {
    /// Nothing ran because the run was not confirmed
    pub skipped: bool,

    /// The container did not exist before
    pub container_created: bool,

    /// Content found under the blob name before the first upload
    pub previous_content: Option<String>,

    /// The upload without overwrite was rejected with a conflict
    pub conflict_observed: bool,

    /// The upload with overwrite succeeded
    pub overwritten: bool,

    /// Properties read after the last step
    pub final_properties: Option<BlobProperties>,
}

/// Runs the blob walkthrough against an [`ObjectStore`]
pub struct BlobWorkflow {
    store: Arc<dyn ObjectStore>,
    container: String,
    blob_name: String,
    confirmed: bool,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl BlobWorkflow {
    /// Creates a walkthrough for the configured container and blob
    ///
    /// Without `confirmed` the run only logs what it would do.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: &StorageConfig,
        confirmed: bool,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            container: config.container_name.clone(),
            blob_name: config.blob_name.clone(),
            confirmed,
            clock: Arc::new(SystemClock),
            shutdown,
        }
    }

    /// Uses `clock` for the message timestamp
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs every step and returns the summary
    ///
    /// # Errors
    ///
    /// Returns the first failed call other than the expected conflict
    pub async fn run(&self) -> Result<BlobWorkflowSummary> {
        let mut summary = BlobWorkflowSummary::default();

        if !self.confirmed {
            tracing::info!(
                container = %self.container,
                blob = %self.blob_name,
                "Would upload a JSON message, overwrite it and update its headers and metadata. \
                 Re-run with --yes to continue."
            );
            summary.skipped = true;
            return Ok(summary);
        }

        let container = self.container.as_str();
        let key = self.blob_name.as_str();

        log_step!(1, format!("Ensure container {container}"));
        summary.container_created = self
            .call("ensure_container", self.store.ensure_container(container))
            .await?;
        tracing::info!(container, created = summary.container_created, "Container ready");

        let message = BlobMessage {
            text: MESSAGE_TEXT.to_string(),
            date_created: self.clock.now(),
        };
        let body = serde_json::to_vec(&message)?;

        log_step!(2, format!("Upload {key} unless it exists"));
        if self.call("exists", self.store.exists(container, key)).await? {
            let content = self
                .call("download", self.store.download(container, key))
                .await?;
            let content = String::from_utf8_lossy(&content).into_owned();
            tracing::warn!(
                blob = key,
                content = %content,
                "Blob already exists, skipping initial upload"
            );

            let properties = self
                .call("get_properties", self.store.get_properties(container, key))
                .await?;
            log_properties(key, &properties);
            summary.previous_content = Some(content);
        } else {
            self.call("upload", self.store.upload(container, key, body.clone(), false))
                .await?;
            tracing::info!(blob = key, bytes = body.len(), "Uploaded");
        }

        log_step!(3, "Upload again without overwrite");
        match cancellable(
            &self.shutdown,
            self.store.upload(container, key, body.clone(), false),
        )
        .await
        {
            Err(e) if e.is_conflict() => {
                tracing::error!(
                    blob = key,
                    status = e.kind().map(|k| k.status()).unwrap_or_default(),
                    error = %e,
                    "Upload without overwrite was rejected, as expected"
                );
                summary.conflict_observed = true;
            }
            Err(e) => {
                log_operation_failed!("upload", &e, blob = key);
                return Err(e);
            }
            Ok(()) => {
                tracing::warn!(blob = key, "Upload without overwrite unexpectedly succeeded");
            }
        }

        log_step!(4, "Upload again with overwrite");
        self.call("upload", self.store.upload(container, key, body, true))
            .await?;
        summary.overwritten = true;
        tracing::info!(blob = key, "Re-uploaded with overwrite = true");

        log_step!(5, "Set HTTP headers");
        let existing = self
            .call("get_properties", self.store.get_properties(container, key))
            .await?;
        let headers = demo_headers(&existing.headers);
        self.call("set_headers", self.store.set_headers(container, key, &headers))
            .await?;
        tracing::info!(
            blob = key,
            content_type = headers.content_type.as_deref().unwrap_or("-"),
            content_language = headers.content_language.as_deref().unwrap_or("-"),
            "Headers updated"
        );

        log_step!(6, "Set metadata");
        let metadata = demo_metadata();
        self.call("set_metadata", self.store.set_metadata(container, key, &metadata))
            .await?;
        tracing::info!(blob = key, entries = metadata.len(), "Metadata updated");

        let properties = self
            .call("get_properties", self.store.get_properties(container, key))
            .await?;
        log_properties(key, &properties);
        summary.final_properties = Some(properties);

        Ok(summary)
    }

    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        cancellable(&self.shutdown, future).await.inspect_err(|e| {
            log_operation_failed!(
                operation,
                e,
                container = %self.container,
                blob = %self.blob_name
            );
        })
    }
}

fn log_properties(key: &str, properties: &BlobProperties) {
    tracing::info!(
        blob = key,
        content_type = properties.headers.content_type.as_deref().unwrap_or("-"),
        content_language = properties.headers.content_language.as_deref().unwrap_or("-"),
        content_hash = properties.headers.content_hash.as_deref().unwrap_or("-"),
        content_length = properties.content_length,
        metadata = ?properties.metadata,
        "Blob properties"
    );
}
