//! Configuration schema types
//!
//! Every service section is optional. A walkthrough whose section is absent,
//! or whose connection settings still hold the `<TO_BE_SET>` placeholder, is
//! skipped rather than failed.

use crate::config::{expose_str, secret_string, SecretString};
use serde::{Deserialize, Serialize};

/// Placeholder shipped in sample configuration files
pub const PLACEHOLDER: &str = "<TO_BE_SET>";

/// True when a setting is missing, blank or still the placeholder
pub fn is_unset(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.trim().is_empty() || v.trim() == PLACEHOLDER,
    }
}

/// Runtime environment
///
/// Selects the optional `{stem}.{environment}.toml` overlay file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

impl Environment {
    /// Lowercase name used in overlay file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Which implementation backs a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The real Azure service
    #[default]
    Azure,
    /// In-process implementation with the same observable behavior
    Memory,
}

/// Main AzLearn configuration
///
/// This is the root configuration structure that maps to the TOML file.
/// Keys outside these sections are ignored here but remain readable through
/// [`crate::config::LayeredConfig::get_string`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AzLearnConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Credential chain settings
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Cosmos DB walkthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cosmosdb: Option<CosmosDbConfig>,

    /// Blob Storage walkthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Key Vault walkthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyvault: Option<KeyVaultConfig>,

    /// Service Bus walkthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servicebus: Option<ServiceBusConfig>,

    /// Document workflow switches
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AzLearnConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.credential.validate()?;
        if let Some(ref cosmos) = self.cosmosdb {
            cosmos.validate()?;
        }
        if let Some(ref storage) = self.storage {
            storage.validate()?;
        }
        if let Some(ref keyvault) = self.keyvault {
            keyvault.validate()?;
        }
        if let Some(ref servicebus) = self.servicebus {
            servicebus.validate()?;
        }
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Timeout applied to every REST call
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        if self.http_timeout_seconds == 0 {
            return Err("application.http_timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: Environment::default(),
            http_timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

/// A credential the chain may try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Service principal with tenant, client id and client secret
    ClientSecret,
    /// Managed identity of the host
    ManagedIdentity,
    /// Token from a logged-in Azure CLI
    AzureCli,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CredentialKind::ClientSecret => "client_secret",
            CredentialKind::ManagedIdentity => "managed_identity",
            CredentialKind::AzureCli => "azure_cli",
        };
        f.write_str(name)
    }
}

/// Credential chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Azure AD tenant ID
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Azure AD client ID (from App Registration)
    #[serde(default)]
    pub client_id: Option<String>,

    /// Azure AD client secret (from App Registration)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub client_secret: Option<SecretString>,

    /// Credentials to try, in order
    #[serde(default = "default_credential_chain")]
    pub chain: Vec<CredentialKind>,
}

impl CredentialConfig {
    fn validate(&self) -> Result<(), String> {
        if self.chain.is_empty() {
            return Err("credential.chain cannot be empty".to_string());
        }
        Ok(())
    }

    /// True if tenant, client id and secret are all present
    pub fn has_client_secret(&self) -> bool {
        !is_unset(self.tenant_id.as_deref())
            && !is_unset(self.client_id.as_deref())
            && !is_unset(self.client_secret.as_ref().map(expose_str))
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            chain: default_credential_chain(),
        }
    }
}

/// Azure Cosmos DB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosDbConfig {
    /// Which implementation to use
    #[serde(default)]
    pub backend: Backend,

    /// Cosmos DB endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Cosmos DB access key
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub key: Option<SecretString>,

    /// `AccountEndpoint=...;AccountKey=...;` connection string, used when
    /// endpoint and key are not set
    #[serde(default)]
    pub connection_string: Option<SecretString>,

    /// Database name
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Container name
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Partition key path
    #[serde(default = "default_partition_key_path")]
    pub partition_key_path: String,

    /// Container default TTL: -1 enables per-document TTL without a default
    #[serde(default = "default_container_ttl")]
    pub default_ttl: Option<i64>,

    /// Phone used for the documents created with a TTL
    #[serde(default = "default_ttl_phone")]
    pub ttl_phone: String,

    /// TTL of those documents, in seconds
    #[serde(default = "default_document_ttl_seconds")]
    pub ttl_seconds: i64,

    /// Maximum items per query page
    #[serde(default = "default_query_page_size")]
    pub query_page_size: usize,
}

/// Endpoint and key resolved from either form of Cosmos DB settings
#[derive(Debug, Clone)]
pub struct CosmosConnection {
    pub endpoint: String,
    pub key: SecretString,
}

impl CosmosDbConfig {
    fn validate(&self) -> Result<(), String> {
        if self.database_name.is_empty() {
            return Err("cosmosdb.database_name cannot be empty".to_string());
        }
        if self.container_name.is_empty() {
            return Err("cosmosdb.container_name cannot be empty".to_string());
        }
        if !self.partition_key_path.starts_with('/') {
            return Err("cosmosdb.partition_key_path must start with '/'".to_string());
        }
        if let Some(ttl) = self.default_ttl {
            if ttl == 0 || ttl < -1 {
                return Err(format!(
                    "cosmosdb.default_ttl must be -1 or positive, got {ttl}"
                ));
            }
        }
        if self.ttl_seconds <= 0 {
            return Err(format!(
                "cosmosdb.ttl_seconds must be positive, got {}",
                self.ttl_seconds
            ));
        }
        if self.query_page_size == 0 || self.query_page_size > 1000 {
            return Err(format!(
                "cosmosdb.query_page_size must be between 1 and 1000, got {}",
                self.query_page_size
            ));
        }
        if let Some(ref endpoint) = self.endpoint {
            if !is_unset(Some(endpoint)) && !endpoint.starts_with("https://") {
                return Err("cosmosdb.endpoint must start with https://".to_string());
            }
        }
        Ok(())
    }

    /// Resolves the account endpoint and key
    ///
    /// Explicit `endpoint` + `key` win over `connection_string`. Returns
    /// `Ok(None)` when neither form is set (or still the placeholder).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is set but malformed
    pub fn connection(&self) -> Result<Option<CosmosConnection>, String> {
        let key_str = self.key.as_ref().map(expose_str);
        if !is_unset(self.endpoint.as_deref()) && !is_unset(key_str) {
            if let (Some(endpoint), Some(key)) = (&self.endpoint, &self.key) {
                return Ok(Some(CosmosConnection {
                    endpoint: endpoint.clone(),
                    key: key.clone(),
                }));
            }
        }

        let Some(ref conn) = self.connection_string else {
            return Ok(None);
        };
        let conn = expose_str(conn);
        if is_unset(Some(conn)) {
            return Ok(None);
        }

        let mut endpoint = None;
        let mut key = None;
        for part in conn.split(';') {
            let part = part.trim();
            if let Some(v) = part.strip_prefix("AccountEndpoint=") {
                endpoint = Some(v.to_string());
            } else if let Some(v) = part.strip_prefix("AccountKey=") {
                key = Some(v.to_string());
            }
        }
        match (endpoint, key) {
            (Some(endpoint), Some(key)) if !endpoint.is_empty() && !key.is_empty() => {
                Ok(Some(CosmosConnection {
                    endpoint,
                    key: secret_string(key),
                }))
            }
            _ => Err(
                "cosmosdb.connection_string must contain AccountEndpoint=...;AccountKey=...;"
                    .to_string(),
            ),
        }
    }
}

impl Default for CosmosDbConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: None,
            key: None,
            connection_string: None,
            database_name: default_database_name(),
            container_name: default_container_name(),
            partition_key_path: default_partition_key_path(),
            default_ttl: default_container_ttl(),
            ttl_phone: default_ttl_phone(),
            ttl_seconds: default_document_ttl_seconds(),
            query_page_size: default_query_page_size(),
        }
    }
}

/// Azure Blob Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which implementation to use
    #[serde(default)]
    pub backend: Backend,

    /// Storage account name
    #[serde(default)]
    pub account_name: Option<String>,

    /// Blob service endpoint, defaults to `https://{account}.blob.core.windows.net`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Container name
    #[serde(default = "default_blob_container")]
    pub container_name: String,

    /// Blob uploaded by the walkthrough
    #[serde(default = "default_blob_name")]
    pub blob_name: String,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        let name = &self.container_name;
        let valid = (3..=63).contains(&name.len())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(format!(
                "storage.container_name '{name}' must be 3-63 lowercase letters, digits or '-'"
            ));
        }
        if self.blob_name.is_empty() {
            return Err("storage.blob_name cannot be empty".to_string());
        }
        Ok(())
    }

    /// Blob service endpoint, `None` when the account is not configured
    pub fn service_endpoint(&self) -> Option<String> {
        if !is_unset(self.endpoint.as_deref()) {
            return self.endpoint.as_ref().map(|e| e.trim_end_matches('/').to_string());
        }
        if is_unset(self.account_name.as_deref()) {
            return None;
        }
        self.account_name
            .as_ref()
            .map(|account| format!("https://{account}.blob.core.windows.net"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            account_name: None,
            endpoint: None,
            container_name: default_blob_container(),
            blob_name: default_blob_name(),
        }
    }
}

/// Azure Key Vault configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyVaultConfig {
    /// Which implementation to use
    #[serde(default)]
    pub backend: Backend,

    /// Vault URI, e.g. `https://my-vault.vault.azure.net/`
    #[serde(default)]
    pub vault_uri: Option<String>,

    /// Secrets named `{prefix}-...` are layered into the configuration
    #[serde(default = "default_secret_prefix")]
    pub secret_prefix: String,

    /// Secret created with a timestamp when missing
    #[serde(default = "default_bootstrap_secret")]
    pub bootstrap_secret: String,

    /// Layer vault secrets over the file settings
    #[serde(default = "default_true")]
    pub load_configuration: bool,
}

impl KeyVaultConfig {
    fn validate(&self) -> Result<(), String> {
        if self.secret_prefix.is_empty() {
            return Err("keyvault.secret_prefix cannot be empty".to_string());
        }
        if self.bootstrap_secret.is_empty() {
            return Err("keyvault.bootstrap_secret cannot be empty".to_string());
        }
        if let Some(ref uri) = self.vault_uri {
            if !is_unset(Some(uri)) && url::Url::parse(uri).is_err() {
                return Err(format!("keyvault.vault_uri '{uri}' is not a valid URL"));
            }
        }
        Ok(())
    }
}

impl Default for KeyVaultConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            vault_uri: None,
            secret_prefix: default_secret_prefix(),
            bootstrap_secret: default_bootstrap_secret(),
            load_configuration: true,
        }
    }
}

/// Azure Service Bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBusConfig {
    /// Which implementation to use
    #[serde(default)]
    pub backend: Backend,

    /// Namespace URI, e.g. `https://my-ns.servicebus.windows.net/`
    #[serde(default)]
    pub namespace_uri: Option<String>,

    /// Queue receiving the scheduled messages
    #[serde(default)]
    pub queue_name: Option<String>,

    /// Number of messages to schedule
    #[serde(default = "default_message_count")]
    pub message_count: usize,

    /// Schedule calls in flight at once
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,

    /// Seconds between scheduling and delivery
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: i64,
}

impl ServiceBusConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_parallelism == 0 || self.max_parallelism > 512 {
            return Err(format!(
                "servicebus.max_parallelism must be between 1 and 512, got {}",
                self.max_parallelism
            ));
        }
        if self.delay_seconds < 0 {
            return Err(format!(
                "servicebus.delay_seconds cannot be negative, got {}",
                self.delay_seconds
            ));
        }
        if let Some(ref uri) = self.namespace_uri {
            if !is_unset(Some(uri)) && url::Url::parse(uri).is_err() {
                return Err(format!("servicebus.namespace_uri '{uri}' is not a valid URL"));
            }
        }
        Ok(())
    }
}

impl Default for ServiceBusConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            namespace_uri: None,
            queue_name: None,
            message_count: default_message_count(),
            max_parallelism: default_max_parallelism(),
            delay_seconds: default_delay_seconds(),
        }
    }
}

/// Document workflow switches
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    /// Pause between steps, in milliseconds
    #[serde(default)]
    pub step_delay_ms: u64,

    /// Remove `/history/1` after the second patch
    #[serde(default)]
    pub remove_history_entry: bool,

    /// Delete the documents created in this session at the end
    #[serde(default)]
    pub delete_created: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.is_empty() {
            return Err(
                "logging.local_path cannot be empty when local logging is enabled".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_credential_chain() -> Vec<CredentialKind> {
    vec![
        CredentialKind::ClientSecret,
        CredentialKind::ManagedIdentity,
        CredentialKind::AzureCli,
    ]
}

fn default_database_name() -> String {
    "CARE".to_string()
}

fn default_container_name() -> String {
    "PhoneStatusInfo".to_string()
}

fn default_partition_key_path() -> String {
    "/phone".to_string()
}

fn default_container_ttl() -> Option<i64> {
    Some(-1)
}

fn default_ttl_phone() -> String {
    "6268889999".to_string()
}

fn default_document_ttl_seconds() -> i64 {
    120
}

fn default_query_page_size() -> usize {
    100
}

fn default_blob_container() -> String {
    "learn-azure-storage".to_string()
}

fn default_blob_name() -> String {
    "test-object.json".to_string()
}

fn default_secret_prefix() -> String {
    "LearnKeyVault".to_string()
}

fn default_bootstrap_secret() -> String {
    "KeyOnline01".to_string()
}

fn default_message_count() -> usize {
    5500
}

fn default_max_parallelism() -> usize {
    32
}

fn default_delay_seconds() -> i64 {
    10
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
