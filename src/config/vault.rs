//! Key Vault configuration source
//!
//! Vault secret names cannot contain `.` or `_`, so after the prefix a `--`
//! separates nested keys and a single `-` stands for `_`:
//!
//! | Secret                                   | Setting                  |
//! |------------------------------------------|--------------------------|
//! | `LearnKeyVault-Key01`                    | `Key01`                  |
//! | `LearnKeyVault-cosmosdb--endpoint`       | `cosmosdb.endpoint`      |
//! | `LearnKeyVault-cosmosdb--database-name`  | `cosmosdb.database_name` |
//!
//! A setting whose name itself contains `-` cannot be set from the vault.
//! Only secrets carrying the configured prefix are loaded, which lets
//! several applications share one vault.

use crate::adapters::secrets::SecretStore;
use crate::domain::result::Result;

/// Delimiter between nested configuration keys
pub const KEY_DELIMITER: &str = ".";

/// Selects and renames vault secrets for the configuration
///
/// # Examples
///
/// ```
/// use azlearn::config::PrefixSecretMapper;
///
/// let mapper = PrefixSecretMapper::new("LearnKeyVault");
/// assert!(mapper.load("LearnKeyVault-Key01"));
/// assert!(!mapper.load("OtherApp-Key01"));
/// assert_eq!(mapper.key("LearnKeyVault-Section--Key"), "Section.Key");
/// assert_eq!(mapper.key("LearnKeyVault-servicebus--queue-name"), "servicebus.queue_name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSecretMapper {
    prefix: String,
}

impl PrefixSecretMapper {
    /// Creates a mapper for secrets named `{prefix}-...`
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: format!("{}-", prefix.as_ref()),
        }
    }

    /// True if the secret belongs to this application
    pub fn load(&self, secret_name: &str) -> bool {
        secret_name.starts_with(&self.prefix)
    }

    /// Configuration key for a secret accepted by [`Self::load`]
    pub fn key(&self, secret_name: &str) -> String {
        secret_name
            .strip_prefix(&self.prefix)
            .unwrap_or(secret_name)
            .split("--")
            .map(|segment| segment.replace('-', "_"))
            .collect::<Vec<_>>()
            .join(KEY_DELIMITER)
    }
}

/// Settings read from the vault, ready to be layered by the loader
#[derive(Debug, Clone, Default)]
pub struct KeyVaultSource {
    entries: Vec<(String, String)>,
}

impl KeyVaultSource {
    /// Builds a source from already mapped `(key, value)` pairs
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Lists the vault and fetches every secret the mapper accepts
    ///
    /// # Errors
    ///
    /// Returns the first listing or retrieval failure
    pub async fn load(store: &dyn SecretStore, mapper: &PrefixSecretMapper) -> Result<Self> {
        let mut names: Vec<String> = store
            .list_secret_names()
            .await?
            .into_iter()
            .filter(|name| mapper.load(name))
            .collect();
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let value = store.get_secret(&name).await?;
            let key = mapper.key(&name);
            tracing::debug!(secret = %name, key = %key, "Loaded setting from Key Vault");
            entries.push((key, value));
        }

        tracing::info!(count = entries.len(), "Key Vault settings loaded");
        Ok(Self { entries })
    }

    /// Mapped `(key, value)` pairs
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of loaded settings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was loaded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
