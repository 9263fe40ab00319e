//! Bearer token acquisition for the REST adapters
//!
//! Blob Storage, Key Vault and Service Bus are called with an Azure AD bearer
//! token. [`CredentialChain`] tries each configured credential in order and
//! returns the first token it gets.

use crate::config::{expose_str, CredentialConfig, CredentialKind};
use crate::domain::{AzLearnError, Result};
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_identity::{AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential};
use std::sync::Arc;

/// Token scope for Blob Storage
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// Token scope for Service Bus
pub const SERVICE_BUS_SCOPE: &str = "https://servicebus.azure.net/.default";

/// Token scope for Key Vault in the public cloud
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Token scope for Key Vault in Azure China
pub const KEY_VAULT_CHINA_SCOPE: &str = "https://vault.azure.cn/.default";

/// Picks the Key Vault scope matching the vault's cloud
///
/// ```
/// use azlearn::adapters::credential::key_vault_scope;
///
/// assert_eq!(
///     key_vault_scope("https://demo.vault.azure.cn/"),
///     "https://vault.azure.cn/.default"
/// );
/// ```
pub fn key_vault_scope(vault_uri: &str) -> &'static str {
    let host = url::Url::parse(vault_uri)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    if host.ends_with(".cn") {
        KEY_VAULT_CHINA_SCOPE
    } else {
        KEY_VAULT_SCOPE
    }
}

/// Something that can produce a bearer token for a scope
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Returns an access token for `scope`
    async fn token(&self, scope: &str) -> Result<String>;
}

/// A token source backed by an `azure_identity` credential
pub struct AzureIdentitySource {
    kind: CredentialKind,
    name: String,
    credential: Arc<dyn TokenCredential>,
}

impl AzureIdentitySource {
    /// Builds the credential for `kind` from the configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a client secret credential is
    /// requested without tenant, client id and secret, or when the
    /// credential cannot be constructed
    pub fn new(kind: CredentialKind, config: &CredentialConfig) -> Result<Self> {
        let credential: Arc<dyn TokenCredential> = match kind {
            CredentialKind::ClientSecret => {
                let (Some(tenant_id), Some(client_id), Some(secret)) = (
                    config.tenant_id.as_deref(),
                    config.client_id.as_deref(),
                    config.client_secret.as_ref(),
                ) else {
                    return Err(AzLearnError::Configuration(
                        "client_secret credential needs tenant_id, client_id and client_secret"
                            .to_string(),
                    ));
                };
                if !config.has_client_secret() {
                    return Err(AzLearnError::Configuration(
                        "client_secret credential settings are not set".to_string(),
                    ));
                }
                let secret = azure_core::credentials::Secret::new(expose_str(secret).to_string());
                ClientSecretCredential::new(tenant_id, client_id.to_string(), secret, None)
                    .map_err(|e| {
                        AzLearnError::Configuration(format!(
                            "Failed to create client secret credential: {e}"
                        ))
                    })?
            }
            CredentialKind::ManagedIdentity => ManagedIdentityCredential::new(None).map_err(|e| {
                AzLearnError::Configuration(format!(
                    "Failed to create managed identity credential: {e}"
                ))
            })?,
            CredentialKind::AzureCli => AzureCliCredential::new(None).map_err(|e| {
                AzLearnError::Configuration(format!("Failed to create Azure CLI credential: {e}"))
            })?,
        };

        Ok(Self {
            kind,
            name: kind.to_string(),
            credential,
        })
    }

    /// Which credential this is
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }
}

#[async_trait]
impl TokenSource for AzureIdentitySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn token(&self, scope: &str) -> Result<String> {
        let token = TokenCredential::get_token(&*self.credential, &[scope], None)
            .await
            .map_err(|e| {
                AzLearnError::Authentication(format!("{} failed to get a token: {e}", self.name))
            })?;

        Ok(token.token.secret().to_string())
    }
}

/// A fixed token, for local emulators and tests
#[derive(Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn token(&self, _scope: &str) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Ordered list of token sources, tried until one succeeds
///
/// # Examples
///
/// ```rust
/// use azlearn::adapters::credential::{CredentialChain, StaticTokenSource, TokenSource};
/// use std::sync::Arc;
///
/// # async fn example() -> azlearn::domain::Result<()> {
/// let chain = CredentialChain::new(vec![Arc::new(StaticTokenSource::new("t0k3n"))]);
/// let token = chain.token("https://storage.azure.com/.default").await?;
/// assert_eq!(token, "t0k3n");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CredentialChain {
    sources: Vec<Arc<dyn TokenSource>>,
}

impl CredentialChain {
    /// Creates a chain from explicit sources
    pub fn new(sources: Vec<Arc<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Builds the chain listed in `credential.chain`
    ///
    /// A client secret entry without its settings is left out of the chain
    /// instead of failing, so the default chain works on hosts that only
    /// have a managed identity or a logged-in CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if no credential could be constructed
    pub fn from_config(config: &CredentialConfig) -> Result<Self> {
        let mut sources: Vec<Arc<dyn TokenSource>> = Vec::new();
        let mut skipped = Vec::new();

        for kind in &config.chain {
            if *kind == CredentialKind::ClientSecret && !config.has_client_secret() {
                tracing::debug!(credential = %kind, "Skipping credential without settings");
                skipped.push(format!("{kind}: not configured"));
                continue;
            }
            match AzureIdentitySource::new(*kind, config) {
                Ok(source) => sources.push(Arc::new(source)),
                Err(e) => {
                    tracing::warn!(credential = %kind, error = %e, "Credential unavailable");
                    skipped.push(format!("{kind}: {e}"));
                }
            }
        }

        if sources.is_empty() {
            return Err(AzLearnError::Authentication(format!(
                "No usable credential in chain ({})",
                skipped.join("; ")
            )));
        }

        tracing::info!(
            chain = %sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(" -> "),
            "Credential chain ready"
        );
        Ok(Self { sources })
    }

    /// Number of sources in the chain
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl TokenSource for CredentialChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn token(&self, scope: &str) -> Result<String> {
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.token(scope).await {
                Ok(token) => {
                    tracing::debug!(credential = source.name(), scope, "Token acquired");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(credential = source.name(), error = %e, "Credential failed");
                    attempts.push(format!("{}: {e}", source.name()));
                }
            }
        }

        Err(AzLearnError::Authentication(format!(
            "All credentials failed for scope {scope}: {}",
            attempts.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource(&'static str);

    #[async_trait]
    impl TokenSource for FailingSource {
        fn name(&self) -> &str {
            self.0
        }

        async fn token(&self, _scope: &str) -> Result<String> {
            Err(AzLearnError::Authentication("no token".to_string()))
        }
    }

    #[test]
    fn test_key_vault_scope_by_cloud() {
        assert_eq!(key_vault_scope("https://demo.vault.azure.net/"), KEY_VAULT_SCOPE);
        assert_eq!(
            key_vault_scope("https://demo.vault.azure.cn/"),
            KEY_VAULT_CHINA_SCOPE
        );
        assert_eq!(key_vault_scope("not a url"), KEY_VAULT_SCOPE);
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_first_success() {
        let chain = CredentialChain::new(vec![
            Arc::new(FailingSource("first")),
            Arc::new(StaticTokenSource::new("second-token")),
            Arc::new(StaticTokenSource::new("third-token")),
        ]);

        let token = chain.token(STORAGE_SCOPE).await.unwrap();
        assert_eq!(token, "second-token");
    }

    #[tokio::test]
    async fn test_chain_reports_every_attempt() {
        let chain = CredentialChain::new(vec![
            Arc::new(FailingSource("first")),
            Arc::new(FailingSource("second")),
        ]);

        let err = chain.token(SERVICE_BUS_SCOPE).await.unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, AzLearnError::Authentication(_)));
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }

    #[test]
    fn test_from_config_skips_unconfigured_client_secret() {
        let config = CredentialConfig {
            chain: vec![CredentialKind::ClientSecret],
            ..Default::default()
        };

        let err = CredentialChain::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("client_secret: not configured"));
    }
}
