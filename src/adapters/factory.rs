//! Service client factory
//!
//! Builds each service from its configuration section. `Ok(None)` means the
//! section's connection settings are missing or still the placeholder, and
//! the walkthrough should be skipped.

use crate::adapters::credential::{CredentialChain, TokenSource};
use crate::adapters::documents::{CosmosDocumentStore, DocumentStore, MemoryDocumentStore};
use crate::adapters::messaging::{MemoryMessageBus, MessageBus, ServiceBusRestBus};
use crate::adapters::secrets::{KeyVaultSecretStore, MemorySecretStore, SecretStore};
use crate::adapters::storage::{BlobRestStore, MemoryObjectStore, ObjectStore};
use crate::config::{
    is_unset, AzLearnConfig, Backend, CosmosDbConfig, KeyVaultConfig, ServiceBusConfig,
    StorageConfig,
};
use crate::domain::{AzLearnError, Result};
use std::sync::Arc;

fn token_source(config: &AzLearnConfig) -> Result<Arc<dyn TokenSource>> {
    Ok(Arc::new(CredentialChain::from_config(&config.credential)?))
}

/// Create the Cosmos DB document store
///
/// # Errors
///
/// Returns a configuration error if the connection string is malformed
pub fn create_document_store(
    config: &CosmosDbConfig,
) -> Result<Option<Arc<dyn DocumentStore>>> {
    match config.backend {
        Backend::Memory => {
            tracing::info!("Creating in-memory document store");
            let store = MemoryDocumentStore::new(&config.database_name)
                .with_page_size(config.query_page_size);
            Ok(Some(Arc::new(store)))
        }
        Backend::Azure => {
            let Some(connection) = config.connection().map_err(AzLearnError::Configuration)?
            else {
                return Ok(None);
            };
            tracing::info!(endpoint = %connection.endpoint, "Creating Cosmos DB document store");
            let store = CosmosDocumentStore::new(
                &connection,
                &config.database_name,
                config.query_page_size,
            )?;
            Ok(Some(Arc::new(store)))
        }
    }
}

/// Create the Blob Storage object store
///
/// # Errors
///
/// Returns an error if no credential in the chain can be built
pub fn create_object_store(
    config: &AzLearnConfig,
    storage: &StorageConfig,
) -> Result<Option<Arc<dyn ObjectStore>>> {
    match storage.backend {
        Backend::Memory => {
            tracing::info!("Creating in-memory object store");
            Ok(Some(Arc::new(MemoryObjectStore::new())))
        }
        Backend::Azure => {
            let Some(endpoint) = storage.service_endpoint() else {
                return Ok(None);
            };
            tracing::info!(endpoint = %endpoint, "Creating Blob Storage client");
            let store = BlobRestStore::new(
                &endpoint,
                token_source(config)?,
                config.application.http_timeout_seconds,
            )?;
            Ok(Some(Arc::new(store)))
        }
    }
}

/// Create the Key Vault secret store
///
/// # Errors
///
/// Returns an error if no credential in the chain can be built
pub fn create_secret_store(
    config: &AzLearnConfig,
    keyvault: &KeyVaultConfig,
) -> Result<Option<Arc<dyn SecretStore>>> {
    match keyvault.backend {
        Backend::Memory => {
            tracing::info!("Creating in-memory secret store");
            Ok(Some(Arc::new(MemorySecretStore::new())))
        }
        Backend::Azure => {
            let Some(vault_uri) = keyvault.vault_uri.as_deref().filter(|u| !is_unset(Some(u)))
            else {
                return Ok(None);
            };
            tracing::info!(vault = %vault_uri, "Creating Key Vault client");
            let store = KeyVaultSecretStore::new(
                vault_uri,
                token_source(config)?,
                config.application.http_timeout_seconds,
            )?;
            Ok(Some(Arc::new(store)))
        }
    }
}

/// Create the Service Bus message bus
///
/// The queue name is required for both backends.
///
/// # Errors
///
/// Returns an error if no credential in the chain can be built
pub fn create_message_bus(
    config: &AzLearnConfig,
    servicebus: &ServiceBusConfig,
) -> Result<Option<Arc<dyn MessageBus>>> {
    if is_unset(servicebus.queue_name.as_deref()) {
        return Ok(None);
    }
    match servicebus.backend {
        Backend::Memory => {
            tracing::info!("Creating in-memory message bus");
            Ok(Some(Arc::new(MemoryMessageBus::new())))
        }
        Backend::Azure => {
            let Some(namespace_uri) = servicebus
                .namespace_uri
                .as_deref()
                .filter(|u| !is_unset(Some(u)))
            else {
                return Ok(None);
            };
            tracing::info!(namespace = %namespace_uri, "Creating Service Bus client");
            let bus = ServiceBusRestBus::new(
                namespace_uri,
                token_source(config)?,
                config.application.http_timeout_seconds,
            )?;
            Ok(Some(Arc::new(bus)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, PLACEHOLDER};

    #[test]
    fn test_placeholder_connection_is_skipped() {
        let config = CosmosDbConfig {
            connection_string: Some(secret_string(PLACEHOLDER.to_string())),
            ..Default::default()
        };
        assert!(create_document_store(&config).unwrap().is_none());
    }

    #[test]
    fn test_malformed_connection_is_configuration_error() {
        let config = CosmosDbConfig {
            connection_string: Some(secret_string("AccountEndpoint=https://x/".to_string())),
            ..Default::default()
        };
        let err = create_document_store(&config).err().unwrap();
        assert!(matches!(err, AzLearnError::Configuration(_)));
    }

    #[test]
    fn test_memory_backends_need_no_credentials() {
        let config = AzLearnConfig::default();
        let storage = StorageConfig {
            backend: Backend::Memory,
            ..Default::default()
        };
        assert!(create_object_store(&config, &storage).unwrap().is_some());

        let servicebus = ServiceBusConfig {
            backend: Backend::Memory,
            queue_name: Some("demo".to_string()),
            ..Default::default()
        };
        assert!(create_message_bus(&config, &servicebus).unwrap().is_some());
    }

    #[test]
    fn test_queue_name_placeholder_is_skipped() {
        let config = AzLearnConfig::default();
        let servicebus = ServiceBusConfig {
            backend: Backend::Memory,
            queue_name: Some(PLACEHOLDER.to_string()),
            ..Default::default()
        };
        assert!(create_message_bus(&config, &servicebus).unwrap().is_none());
    }
}
