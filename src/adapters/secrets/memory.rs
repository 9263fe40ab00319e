//! In-process secret store

use super::traits::{validate_secret_name, SecretStore};
use crate::domain::{AzLearnError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Secret store kept in memory; each set replaces the current version
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<BTreeMap<String, Vec<String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions written for `name`
    pub async fn version_count(&self, name: &str) -> usize {
        self.secrets.read().await.get(name).map_or(0, Vec::len)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, name: &str) -> Result<String> {
        validate_secret_name(name)?;
        self.secrets
            .read()
            .await
            .get(name)
            .and_then(|versions| versions.last().cloned())
            .ok_or_else(|| AzLearnError::not_found(format!("Secret '{name}' was not found")))
    }

    async fn set_secret(&self, name: &str, value: &str) -> Result<()> {
        validate_secret_name(name)?;
        self.secrets
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn list_secret_names(&self) -> Result<Vec<String>> {
        Ok(self.secrets.read().await.keys().cloned().collect())
    }
}
