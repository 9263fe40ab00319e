//! In-process object store

use super::traits::ObjectStore;
use crate::adapters::clock::{Clock, SystemClock};
use crate::domain::{
    normalize_metadata, AzLearnError, BlobHttpHeaders, BlobMetadata, BlobProperties, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    properties: BlobProperties,
}

type Containers = HashMap<String, HashMap<String, StoredObject>>;

/// Object store kept in memory
pub struct MemoryObjectStore {
    containers: RwLock<Containers>,
    clock: Arc<dyn Clock>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn container_missing(container: &str) -> AzLearnError {
    AzLearnError::not_found(format!("Container '{container}' does not exist"))
}

fn object_missing(container: &str, key: &str) -> AzLearnError {
    AzLearnError::not_found(format!("Blob '{container}/{key}' does not exist"))
}

fn object_mut<'a>(
    containers: &'a mut Containers,
    container: &str,
    key: &str,
) -> Result<&'a mut StoredObject> {
    containers
        .get_mut(container)
        .ok_or_else(|| container_missing(container))?
        .get_mut(key)
        .ok_or_else(|| object_missing(container, key))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_container(&self, container: &str) -> Result<bool> {
        let mut containers = self.containers.write().await;
        if containers.contains_key(container) {
            return Ok(false);
        }
        containers.insert(container.to_string(), HashMap::new());
        Ok(true)
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool> {
        let containers = self.containers.read().await;
        let objects = containers
            .get(container)
            .ok_or_else(|| container_missing(container))?;
        Ok(objects.contains_key(key))
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        overwrite: bool,
    ) -> Result<()> {
        let mut containers = self.containers.write().await;
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| container_missing(container))?;

        if !overwrite && objects.contains_key(key) {
            return Err(AzLearnError::conflict(format!(
                "Blob '{container}/{key}' already exists"
            )));
        }

        let properties = BlobProperties {
            headers: BlobHttpHeaders::default(),
            metadata: BlobMetadata::new(),
            content_length: data.len() as u64,
            last_modified: Some(self.clock.now()),
        };
        objects.insert(key.to_string(), StoredObject { data, properties });
        Ok(())
    }

    async fn download(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .ok_or_else(|| container_missing(container))?
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| object_missing(container, key))
    }

    async fn get_properties(&self, container: &str, key: &str) -> Result<BlobProperties> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .ok_or_else(|| container_missing(container))?
            .get(key)
            .map(|object| object.properties.clone())
            .ok_or_else(|| object_missing(container, key))
    }

    async fn set_metadata(
        &self,
        container: &str,
        key: &str,
        metadata: &BlobMetadata,
    ) -> Result<()> {
        let mut containers = self.containers.write().await;
        let object = object_mut(&mut containers, container, key)?;
        object.properties.metadata = normalize_metadata(metadata);
        object.properties.last_modified = Some(self.clock.now());
        Ok(())
    }

    async fn set_headers(
        &self,
        container: &str,
        key: &str,
        headers: &BlobHttpHeaders,
    ) -> Result<()> {
        let mut containers = self.containers.write().await;
        let object = object_mut(&mut containers, container, key)?;
        object.properties.headers = headers.clone();
        object.properties.last_modified = Some(self.clock.now());
        Ok(())
    }
}
