//! Secret store adapters
//!
//! - [`KeyVaultSecretStore`] - Azure Key Vault REST API
//! - [`MemorySecretStore`] - in-process store for tests and offline runs

pub mod keyvault;
pub mod memory;
pub mod traits;

pub use keyvault::KeyVaultSecretStore;
pub use memory::MemorySecretStore;
pub use traits::{validate_secret_name, SecretStore};
