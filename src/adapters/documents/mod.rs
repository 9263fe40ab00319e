//! Document store adapters
//!
//! - [`CosmosDocumentStore`] - Azure Cosmos DB through `azure_data_cosmos`
//! - [`MemoryDocumentStore`] - in-process store for tests and offline runs
//!
//! A [`DocumentStore`] is one database. [`DocumentStore::ensure_container`]
//! returns the [`DocumentContainer`] handle that carries the item operations.

pub mod cosmos;
pub mod memory;
pub mod traits;

pub use cosmos::CosmosDocumentStore;
pub use memory::MemoryDocumentStore;
pub use traits::{query_pages, DocumentContainer, DocumentStore};
