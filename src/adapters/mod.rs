//! External service integrations for AzLearn.
//!
//! Every service sits behind a trait with an Azure implementation and an
//! in-memory implementation:
//!
//! - [`documents`] - Cosmos DB documents ([`documents::DocumentStore`])
//! - [`storage`] - Blob Storage objects ([`storage::ObjectStore`])
//! - [`secrets`] - Key Vault secrets ([`secrets::SecretStore`])
//! - [`messaging`] - Service Bus queues ([`messaging::MessageBus`])
//!
//! Supporting modules:
//!
//! - [`credential`] - bearer tokens through an ordered credential chain
//! - [`clock`] - time source for expiry and scheduled delivery
//! - [`factory`] - picks the implementation from the configuration
//!
//! ```rust
//! use azlearn::adapters::documents::{DocumentStore, MemoryDocumentStore};
//! use azlearn::domain::{ContainerSpec, TtlSetting};
//! use serde_json::json;
//!
//! # async fn example() -> azlearn::domain::Result<()> {
//! let store = MemoryDocumentStore::new("CARE");
//! store.ensure_database().await?;
//! let spec = ContainerSpec::new("PhoneStatusInfo", "/phone", TtlSetting::NoDefault)
//!     .map_err(azlearn::domain::AzLearnError::Validation)?;
//! let container = store.ensure_container(&spec).await?;
//!
//! let created = container.create(&json!({"id": "1", "phone": "6268889999"})).await?;
//! println!("created for {}", created.request_charge);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod credential;
pub mod documents;
pub mod factory;
pub mod http;
pub mod messaging;
pub mod secrets;
pub mod storage;
