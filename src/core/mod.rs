//! Walkthrough workflows for AzLearn.
//!
//! Each workflow drives one service through a fixed sequence of awaited
//! calls and returns a summary:
//!
//! - [`documents`] - Cosmos DB create, query, read, upsert, patch and delete
//! - [`blobs`] - Blob Storage upload, overwrite protection, headers and metadata
//! - [`secrets`] - Key Vault bootstrap and vault-backed configuration
//! - [`schedule`] - Service Bus scheduled messages with bounded parallelism
//!
//! Every workflow takes the process-wide shutdown receiver; see [`cancel`].
//!
//! # Example
//!
//! ```rust,no_run
//! use azlearn::adapters::documents::MemoryDocumentStore;
//! use azlearn::core::documents::{DocumentWorkflow, DocumentWorkflowSettings};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let store = Arc::new(MemoryDocumentStore::new("CARE"));
//! let workflow = DocumentWorkflow::new(store, DocumentWorkflowSettings::default(), shutdown_rx);
//!
//! let summary = workflow.run().await?;
//! println!("Created: {}", summary.created);
//! println!("Total charge: {}", summary.total_charge);
//! # Ok(())
//! # }
//! ```

pub mod blobs;
pub mod cancel;
pub mod documents;
pub mod schedule;
pub mod secrets;
