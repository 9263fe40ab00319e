//! Documents command implementation
//!
//! Runs the Cosmos DB walkthrough against the configured document store.

use super::{failure_exit_code, load_or_report, report_not_configured};
use crate::adapters::factory::create_document_store;
use crate::config::ConfigLoader;
use crate::core::documents::{DocumentWorkflow, DocumentWorkflowSettings};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the documents command
#[derive(Args, Debug)]
pub struct DocumentsArgs {
    /// Remove history[1] after the second patch
    #[arg(long)]
    pub remove_history_entry: bool,

    /// Delete the documents created in this session at the end
    #[arg(long)]
    pub delete_created: bool,
}

impl DocumentsArgs {
    /// Execute the documents command
    pub async fn execute(
        &self,
        loader: &ConfigLoader,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting documents command");

        let Some(layered) = load_or_report(loader) else {
            return Ok(2); // Configuration error exit code
        };
        let config = layered.config();
        let cosmos = config.cosmosdb.clone().unwrap_or_default();

        let store = match create_document_store(&cosmos) {
            Ok(Some(store)) => store,
            Ok(None) => {
                return Ok(report_not_configured(
                    "Cosmos DB",
                    "cosmosdb.connection_string (or cosmosdb.endpoint and cosmosdb.key)",
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Cosmos DB client");
                eprintln!("Failed to create Cosmos DB client: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let mut workflow_config = config.workflow.clone();
        if self.remove_history_entry {
            tracing::info!("Enabling history removal from CLI");
            workflow_config.remove_history_entry = true;
        }
        if self.delete_created {
            tracing::info!("Enabling deletion of session documents from CLI");
            workflow_config.delete_created = true;
        }

        let settings = match DocumentWorkflowSettings::from_config(&cosmos, &workflow_config) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!(
            "🚀 Starting document walkthrough on {}/{}...",
            cosmos.database_name, settings.container.id
        );
        println!();

        let summary = match DocumentWorkflow::new(store, settings, shutdown_signal)
            .run()
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Document walkthrough failed: {e}");
                return Ok(failure_exit_code(&e));
            }
        };

        println!();
        println!("📊 Document Summary:");
        if let Some(ref phone) = summary.session_phone {
            println!("  Session phone: {phone}");
        }
        println!("  Created: {}", summary.created);
        println!("  Queried: {}", summary.queried);
        println!("  Read: {}", summary.read);
        println!("  Upserted: {}", summary.upserted);
        println!("  Patched: {}", summary.patched);
        println!("  Deleted: {}", summary.deleted);
        for (operation, charge) in &summary.charges {
            println!("  {operation}: {charge}");
        }
        println!("  Total charge: {}", summary.total_charge);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if summary.is_successful() {
            println!("✅ Document walkthrough completed successfully!");
            Ok(0)
        } else {
            println!("⚠️  Document walkthrough completed with errors:");
            for error in &summary.errors {
                println!("  - {error}");
            }
            Ok(1) // Partial success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_connection_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(&path, "[cosmosdb]\nconnection_string = \"<TO_BE_SET>\"\n").unwrap();

        let (_tx, rx) = watch::channel(false);
        let args = DocumentsArgs {
            remove_history_entry: false,
            delete_created: false,
        };
        let code = args.execute(&ConfigLoader::new(&path), rx).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("azlearn.toml"))
            .with_env_prefix("AZLEARN_TEST_DOCUMENTS_NO_FILE");

        let (_tx, rx) = watch::channel(false);
        let args = DocumentsArgs {
            remove_history_entry: false,
            delete_created: false,
        };
        assert_eq!(args.execute(&loader, rx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_with_set_override_runs() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("azlearn.toml"))
            .with_env_prefix("AZLEARN_TEST_DOCUMENTS_NO_FILE")
            .with_cli_overrides(&["cosmosdb.backend=memory"])
            .unwrap();

        let (_tx, rx) = watch::channel(false);
        let args = DocumentsArgs {
            remove_history_entry: false,
            delete_created: false,
        };
        assert_eq!(args.execute(&loader, rx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_backend_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(&path, "[cosmosdb]\nbackend = \"memory\"\n").unwrap();

        let (_tx, rx) = watch::channel(false);
        let args = DocumentsArgs {
            remove_history_entry: true,
            delete_created: true,
        };
        let code = args.execute(&ConfigLoader::new(&path), rx).await.unwrap();
        assert_eq!(code, 0);
    }
}
