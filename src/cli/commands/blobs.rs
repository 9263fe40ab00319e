//! Blobs command implementation
//!
//! Runs the Blob Storage walkthrough against the configured object store.

use super::{failure_exit_code, load_or_report, report_not_configured};
use crate::adapters::factory::create_object_store;
use crate::config::ConfigLoader;
use crate::core::blobs::BlobWorkflow;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the blobs command
#[derive(Args, Debug)]
pub struct BlobsArgs {
    /// Write to the storage account; without it the command only describes the steps
    #[arg(short, long)]
    pub yes: bool,
}

impl BlobsArgs {
    /// Execute the blobs command
    pub async fn execute(
        &self,
        loader: &ConfigLoader,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting blobs command");

        let Some(layered) = load_or_report(loader) else {
            return Ok(2); // Configuration error exit code
        };
        let config = layered.config();
        let storage = config.storage.clone().unwrap_or_default();

        let store = match create_object_store(config, &storage) {
            Ok(Some(store)) => store,
            Ok(None) => {
                return Ok(report_not_configured(
                    "Blob Storage",
                    "storage.account_name (or storage.endpoint)",
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Blob Storage client");
                eprintln!("Failed to create Blob Storage client: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if !self.yes {
            println!(
                "We're going to save a JSON message to {}/{}. Re-run with --yes to continue.",
                storage.container_name, storage.blob_name
            );
        }

        let summary = match BlobWorkflow::new(store, &storage, self.yes, shutdown_signal)
            .run()
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Blob walkthrough failed: {e}");
                return Ok(failure_exit_code(&e));
            }
        };

        if summary.skipped {
            return Ok(0);
        }

        println!();
        println!("📊 Blob Summary:");
        println!("  Container created: {}", summary.container_created);
        println!("  Existed before: {}", summary.previous_content.is_some());
        println!("  Conflict without overwrite: {}", summary.conflict_observed);
        println!("  Overwritten: {}", summary.overwritten);
        if let Some(ref properties) = summary.final_properties {
            println!(
                "  Content type: {}",
                properties.headers.content_type.as_deref().unwrap_or("-")
            );
            println!("  Metadata: {:?}", properties.metadata);
        }
        println!();
        println!("✅ Blob walkthrough completed successfully!");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unset_account_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(&path, "[storage]\naccount_name = \"<TO_BE_SET>\"\n").unwrap();

        let (_tx, rx) = watch::channel(false);
        let code = BlobsArgs { yes: true }
            .execute(&ConfigLoader::new(&path), rx)
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_memory_backend_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(&path, "[storage]\nbackend = \"memory\"\n").unwrap();

        let (_tx, rx) = watch::channel(false);
        let code = BlobsArgs { yes: true }
            .execute(&ConfigLoader::new(&path), rx)
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
