//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for AzLearn using clap.

pub mod commands;

use crate::config::ConfigLoader;
use clap::{ArgAction, Parser, Subcommand};

/// AzLearn - Azure service client walkthroughs
#[derive(Parser, Debug)]
#[command(name = "azlearn")]
#[command(version, about, long_about = None)]
#[command(author = "AzLearn Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "azlearn.toml", env = "AZLEARN_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "AZLEARN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override a setting, e.g. `--set cosmosdb.backend=memory` (repeatable,
    /// given before the subcommand)
    #[arg(long = "set", value_name = "KEY=VALUE", action = ArgAction::Append)]
    pub set: Vec<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration loader for the file and `--set` overrides given
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a malformed `--set` entry
    pub fn loader(&self) -> crate::domain::Result<ConfigLoader> {
        ConfigLoader::new(&self.config).with_cli_overrides(&self.set)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cosmos DB: create, query, read, upsert, patch and delete documents
    Documents(commands::documents::DocumentsArgs),

    /// Blob Storage: upload, overwrite protection, headers and metadata
    Blobs(commands::blobs::BlobsArgs),

    /// Key Vault: bootstrap a secret and layer vault settings into the configuration
    Secrets(commands::secrets::SecretsArgs),

    /// Service Bus: schedule messages with bounded parallelism
    Schedule(commands::schedule::ScheduleArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_documents() {
        let cli = Cli::parse_from(["azlearn", "documents"]);
        assert_eq!(cli.config, "azlearn.toml");
        assert!(matches!(cli.command, Commands::Documents(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["azlearn", "--config", "custom.toml", "documents"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["azlearn", "--log-level", "debug", "secrets"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_repeated_set() {
        let cli = Cli::parse_from([
            "azlearn",
            "--set",
            "cosmosdb.backend=memory",
            "--set",
            "storage.backend=memory",
            "blobs",
        ]);
        assert_eq!(cli.set, vec!["cosmosdb.backend=memory", "storage.backend=memory"]);
        assert!(cli.loader().is_ok());
    }

    #[test]
    fn test_cli_rejects_set_after_subcommand() {
        let result = Cli::try_parse_from([
            "azlearn",
            "--set",
            "cosmosdb.backend=memory",
            "blobs",
            "--set",
            "storage.backend=memory",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_malformed_set() {
        let cli = Cli::parse_from(["azlearn", "--set", "novalue", "validate-config"]);
        assert!(cli.loader().is_err());
    }

    #[test]
    fn test_cli_parse_documents_flags() {
        let cli = Cli::parse_from([
            "azlearn",
            "documents",
            "--remove-history-entry",
            "--delete-created",
        ]);
        match cli.command {
            Commands::Documents(args) => {
                assert!(args.remove_history_entry);
                assert!(args.delete_created);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_schedule_overrides() {
        let cli = Cli::parse_from([
            "azlearn",
            "schedule",
            "--count",
            "100",
            "--parallelism",
            "8",
            "--delay-seconds",
            "30",
        ]);
        match cli.command {
            Commands::Schedule(args) => {
                assert_eq!(args.count, Some(100));
                assert_eq!(args.parallelism, Some(8));
                assert_eq!(args.delay_seconds, Some(30));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_blobs_and_init() {
        let cli = Cli::parse_from(["azlearn", "blobs", "--yes"]);
        assert!(matches!(cli.command, Commands::Blobs(ref a) if a.yes));

        let cli = Cli::parse_from(["azlearn", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init(ref a) if a.force));
    }
}
