//! Configuration management for AzLearn.
//!
//! AzLearn reads a TOML file (`azlearn.toml` by default) and layers an
//! environment overlay, `AZLEARN_*` environment variables, `--set`
//! overrides and, for the secrets walkthrough, Key Vault secrets on top.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use azlearn::config::ConfigLoader;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layered = ConfigLoader::new("azlearn.toml")
//!     .with_override("cosmosdb.backend", "memory")
//!     .load()?;
//!
//! if let Some(cosmos) = &layered.config().cosmosdb {
//!     println!("Cosmos DB database: {}", cosmos.database_name);
//! }
//! println!("Key01 = {:?}", layered.get_string("Key01"));
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! environment = "development"
//!
//! [credential]
//! tenant_id = "${AZURE_TENANT_ID}"
//! client_id = "${AZURE_CLIENT_ID}"
//! client_secret = "${AZURE_CLIENT_SECRET}"
//!
//! [cosmosdb]
//! connection_string = "<TO_BE_SET>"
//!
//! [storage]
//! account_name = "mystorageaccount"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;
pub mod vault;

// Re-export commonly used types
pub use loader::{load_config, ConfigLoader, LayeredConfig};
pub use schema::{
    is_unset, ApplicationConfig, AzLearnConfig, Backend, CosmosConnection, CosmosDbConfig,
    CredentialConfig, CredentialKind, Environment, KeyVaultConfig, LoggingConfig,
    ServiceBusConfig, StorageConfig, WorkflowConfig, PLACEHOLDER,
};
pub use secret::{expose_str, secret_string, SecretString, SecretValue};
pub use vault::{KeyVaultSource, PrefixSecretMapper};
