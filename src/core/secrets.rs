//! Key Vault walkthrough
//!
//! Reads a secret, creating it with a timestamp when it does not exist yet,
//! then shows how prefixed vault secrets override file settings once the
//! vault is layered into the configuration.

use crate::adapters::clock::{Clock, SystemClock};
use crate::adapters::secrets::SecretStore;
use crate::config::{
    ConfigLoader, KeyVaultConfig, KeyVaultSource, LayeredConfig, PrefixSecretMapper,
};
use crate::core::cancel::cancellable;
use crate::domain::Result;
use crate::{log_operation_failed, log_step};
use chrono::SecondsFormat;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Setting normally only present in the vault
pub const KEY_ONLINE_01: &str = "KeyOnline01";

/// File setting a vault secret can override
pub const KEY_01: &str = "Key01";

/// File setting a vault secret can override
pub const KEY_02: &str = "Key02";

/// Plain file setting
pub const KEY_SAMPLE: &str = "KeySample";

/// Settings logged at the end of the walkthrough
pub const DISPLAYED_KEYS: [&str; 4] = [KEY_ONLINE_01, KEY_01, KEY_02, KEY_SAMPLE];

/// Result of [`get_or_bootstrap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrappedSecret {
    pub value: String,

    /// The secret did not exist and was created by this call
    pub created: bool,
}

/// Reads `name`, creating it with the current time when it is missing
///
/// Only a `NotFound` failure triggers the creation. Calling this again
/// returns the stored value unchanged.
///
/// # Errors
///
/// Returns any failure other than `NotFound`, or the failure to store
/// the new value
pub async fn get_or_bootstrap(
    store: &dyn SecretStore,
    name: &str,
    clock: &dyn Clock,
) -> Result<BootstrappedSecret> {
    match store.get_secret(name).await {
        Ok(value) => {
            tracing::info!(secret = name, value = %value, "Found secret");
            Ok(BootstrappedSecret {
                value,
                created: false,
            })
        }
        Err(e) if e.is_not_found() => {
            let value = clock.now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
            tracing::info!(
                secret = name,
                value = %value,
                "Secret not found, creating it"
            );
            store.set_secret(name, &value).await?;
            Ok(BootstrappedSecret {
                value,
                created: true,
            })
        }
        Err(e) => Err(e),
    }
}

/// Outcome of a secrets walkthrough
#[derive(Debug, Clone, Default)]
pub struct SecretWorkflowSummary {
    /// Name of the bootstrapped secret
    pub secret_name: String,

    /// Its value after the walkthrough
    pub secret_value: String,

    /// The secret was created by this run
    pub created: bool,

    /// Number of settings loaded from the vault
    pub vault_settings: usize,

    /// Value of each displayed key as seen through the layered configuration
    pub settings: BTreeMap<String, Option<String>>,
}

/// Runs the secrets walkthrough against a [`SecretStore`]
pub struct SecretWorkflow {
    store: Arc<dyn SecretStore>,
    loader: ConfigLoader,
    keyvault: KeyVaultConfig,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl SecretWorkflow {
    /// `loader` reproduces the configuration the command was started with;
    /// vault settings are layered on top of it
    pub fn new(
        store: Arc<dyn SecretStore>,
        loader: ConfigLoader,
        keyvault: KeyVaultConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            loader,
            keyvault,
            clock: Arc::new(SystemClock),
            shutdown,
        }
    }

    /// Uses `clock` for the bootstrap value
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs every step and returns the summary
    ///
    /// # Errors
    ///
    /// Returns any vault failure other than the handled `NotFound`, or a
    /// configuration error when the layered settings do not validate
    pub async fn run(&self) -> Result<SecretWorkflowSummary> {
        let name = self.keyvault.bootstrap_secret.as_str();

        log_step!(1, format!("Get or create secret {name}"));
        let secret = cancellable(
            &self.shutdown,
            get_or_bootstrap(self.store.as_ref(), name, self.clock.as_ref()),
        )
        .await
        .inspect_err(|e| {
            log_operation_failed!("get_secret", e, secret = name);
        })?;

        log_step!(2, "Build configuration with Key Vault settings");
        let (layered, vault_settings) = if self.keyvault.load_configuration {
            let mapper = PrefixSecretMapper::new(&self.keyvault.secret_prefix);
            let source = cancellable(
                &self.shutdown,
                KeyVaultSource::load(self.store.as_ref(), &mapper),
            )
            .await
            .inspect_err(|e| {
                log_operation_failed!("list_secrets", e, prefix = %self.keyvault.secret_prefix);
            })?;
            let count = source.len();
            (self.loader.clone().with_vault(source).load()?, count)
        } else {
            tracing::info!("Vault configuration disabled (keyvault.load_configuration = false)");
            (self.loader.load()?, 0)
        };

        log_step!(3, "Show settings");
        tracing::info!(
            "A vault secret named '{}-{KEY_01}' overrides the file setting '{KEY_01}'",
            self.keyvault.secret_prefix
        );
        let settings = displayed_settings(&layered);

        Ok(SecretWorkflowSummary {
            secret_name: name.to_string(),
            secret_value: secret.value,
            created: secret.created,
            vault_settings,
            settings,
        })
    }
}

fn displayed_settings(layered: &LayeredConfig) -> BTreeMap<String, Option<String>> {
    DISPLAYED_KEYS
        .iter()
        .map(|key| {
            let value = layered.get_string(key);
            tracing::info!(
                key = *key,
                value = value.as_deref().unwrap_or("<not set>"),
                "Configuration value"
            );
            (key.to_string(), value)
        })
        .collect()
}
