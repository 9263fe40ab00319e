// AzLearn - Azure service client walkthroughs
// Copyright (c) 2025 AzLearn Contributors
// Licensed under the MIT License

//! # AzLearn - Azure service client walkthroughs
//!
//! AzLearn is a command-line tool that exercises four Azure services through
//! their clients, step by step, logging what each call returned:
//!
//! - **Cosmos DB**: create a container with TTL, then create, query, read,
//!   upsert, patch and delete `PhoneStatusInfo` documents while tracking
//!   request charges
//! - **Blob Storage**: upload a JSON message, observe the conflict when the
//!   blob exists, overwrite it and set headers and metadata
//! - **Key Vault**: bootstrap a secret and layer prefixed vault secrets into
//!   the configuration
//! - **Service Bus**: schedule thousands of messages with bounded parallelism
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - The walkthrough workflows and cancellation helpers
//! - [`adapters`] - Service traits with Azure and in-memory implementations
//! - [`domain`] - Documents, messages, responses and errors
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azlearn::adapters::factory::create_document_store;
//! use azlearn::config::ConfigLoader;
//! use azlearn::core::documents::{DocumentWorkflow, DocumentWorkflowSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layered = ConfigLoader::new("azlearn.toml")
//!         .with_override("cosmosdb.backend", "memory")
//!         .load()?;
//!     let config = layered.config();
//!     let cosmos = config.cosmosdb.clone().unwrap_or_default();
//!
//!     let Some(store) = create_document_store(&cosmos)? else {
//!         return Ok(());
//!     };
//!     let settings = DocumentWorkflowSettings::from_config(&cosmos, &config.workflow)?;
//!     let (_tx, shutdown) = tokio::sync::watch::channel(false);
//!
//!     let summary = DocumentWorkflow::new(store, settings, shutdown).run().await?;
//!     println!("Total request charge: {}", summary.total_charge);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`], whose error type
//! [`domain::AzLearnError`] carries the service status, an
//! [`domain::ErrorKind`] and, for Cosmos DB, the request charge:
//!
//! ```rust,no_run
//! use azlearn::domain::{AzLearnError, ErrorKind};
//!
//! fn describe(err: &AzLearnError) -> &'static str {
//!     match err.kind() {
//!         Some(ErrorKind::NotFound) => "missing",
//!         Some(ErrorKind::Conflict) => "already exists",
//!         _ => "failed",
//!     }
//! }
//! ```
//!
//! ## Logging
//!
//! AzLearn uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(operation = "create_item", request_charge = 6.29, "Operation succeeded");
//! warn!(blob = "test-object.json", "Blob already exists");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
