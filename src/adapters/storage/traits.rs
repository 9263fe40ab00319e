//! Object store abstraction

use crate::domain::{BlobHttpHeaders, BlobMetadata, BlobProperties, Result};
use async_trait::async_trait;

/// Containers of named byte objects with headers and metadata
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Creates the container if needed; returns `true` if it was created
    async fn ensure_container(&self, container: &str) -> Result<bool>;

    async fn exists(&self, container: &str, key: &str) -> Result<bool>;

    /// Stores `data` under `key`
    ///
    /// Headers and metadata of a replaced object are reset.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` request error when `overwrite` is false and the
    /// key is already occupied.
    async fn upload(&self, container: &str, key: &str, data: Vec<u8>, overwrite: bool)
        -> Result<()>;

    /// Returns the object content; `NotFound` if absent
    async fn download(&self, container: &str, key: &str) -> Result<Vec<u8>>;

    /// Headers, metadata and length; metadata names come back lowercased
    async fn get_properties(&self, container: &str, key: &str) -> Result<BlobProperties>;

    /// Replaces all user metadata
    async fn set_metadata(&self, container: &str, key: &str, metadata: &BlobMetadata)
        -> Result<()>;

    /// Replaces all HTTP headers; fields left `None` are cleared
    async fn set_headers(&self, container: &str, key: &str, headers: &BlobHttpHeaders)
        -> Result<()>;
}
