//! Key Vault secrets over the REST API

use super::traits::{validate_secret_name, SecretStore};
use crate::adapters::credential::{key_vault_scope, TokenSource};
use crate::adapters::http::{build_client, check_status, send_error};
use crate::domain::{AzLearnError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

/// Key Vault REST API version
pub const API_VERSION: &str = "7.4";

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SecretItem {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretListPage {
    #[serde(default)]
    value: Vec<SecretItem>,
    next_link: Option<String>,
}

/// Secret store backed by an Azure Key Vault
pub struct KeyVaultSecretStore {
    client: Client,
    vault_uri: String,
    scope: &'static str,
    credential: Arc<dyn TokenSource>,
}

impl KeyVaultSecretStore {
    /// Creates a store for the vault at `vault_uri`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        vault_uri: &str,
        credential: Arc<dyn TokenSource>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            vault_uri: vault_uri.trim_end_matches('/').to_string(),
            scope: key_vault_scope(vault_uri),
            credential,
        })
    }

    /// Vault base URI without the trailing slash
    pub fn vault_uri(&self) -> &str {
        &self.vault_uri
    }

    fn secret_url(&self, name: &str) -> String {
        format!("{}/secrets/{name}?api-version={API_VERSION}", self.vault_uri)
    }

    async fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.credential.token(self.scope).await?))
    }
}

/// Secret name is the segment after `/secrets/` in a secret id
fn name_from_id(id: &str) -> Option<String> {
    let url = url::Url::parse(id).ok()?;
    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("secrets"), Some(name)) if !name.is_empty() => Some(name.to_string()),
        _ => None,
    }
}

#[async_trait]
impl SecretStore for KeyVaultSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String> {
        validate_secret_name(name)?;
        let response = self
            .client
            .get(self.secret_url(name))
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| send_error("get secret", e))?;
        let response = check_status(&format!("get secret {name}"), response).await?;

        let bundle: SecretBundle = response.json().await.map_err(|e| {
            AzLearnError::Serialization(format!("Invalid secret response for {name}: {e}"))
        })?;
        tracing::debug!(secret = name, "Secret retrieved");
        Ok(bundle.value)
    }

    async fn set_secret(&self, name: &str, value: &str) -> Result<()> {
        validate_secret_name(name)?;
        let response = self
            .client
            .put(self.secret_url(name))
            .header("Authorization", self.bearer().await?)
            .json(&serde_json::json!({ "value": value }))
            .send()
            .await
            .map_err(|e| send_error("set secret", e))?;
        check_status(&format!("set secret {name}"), response).await?;

        tracing::debug!(secret = name, "Secret version written");
        Ok(())
    }

    async fn list_secret_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next = Some(format!("{}/secrets?api-version={API_VERSION}", self.vault_uri));

        while let Some(url) = next.take() {
            let response = self
                .client
                .get(&url)
                .header("Authorization", self.bearer().await?)
                .send()
                .await
                .map_err(|e| send_error("list secrets", e))?;
            let response = check_status("list secrets", response).await?;

            let page: SecretListPage = response.json().await.map_err(|e| {
                AzLearnError::Serialization(format!("Invalid secret list response: {e}"))
            })?;
            names.extend(page.value.iter().filter_map(|item| name_from_id(&item.id)));
            next = page.next_link.filter(|link| !link.is_empty());
        }

        tracing::debug!(count = names.len(), "Secrets listed");
        Ok(names)
    }
}
