//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the AzLearn configuration file and showing which walkthroughs would run.

use crate::config::{is_unset, AzLearnConfig, Backend, ConfigLoader};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, loader: &ConfigLoader) -> anyhow::Result<i32> {
        let config_path = loader.path().display().to_string();
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let layered = match loader.clone().require_file(true).load() {
            Ok(layered) => {
                println!("✅ Configuration is valid");
                layered
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!();
        println!("Configuration Summary:");
        for line in summary_lines(layered.config()) {
            println!("  {line}");
        }
        println!();
        Ok(0)
    }
}

/// Human readable status of every section; secrets are never printed
fn summary_lines(config: &AzLearnConfig) -> Vec<String> {
    let mut lines = vec![
        format!("Environment: {}", config.application.environment.as_str()),
        format!("Log Level: {}", config.application.log_level),
        format!(
            "Credential Chain: {}",
            config
                .credential
                .chain
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ")
        ),
        format!(
            "Client Secret Credential: {}",
            if config.credential.has_client_secret() {
                "configured"
            } else {
                "not configured"
            }
        ),
    ];

    lines.push(match config.cosmosdb {
        Some(ref cosmos) if cosmos.backend == Backend::Memory => {
            format!("Cosmos DB: in-memory ({}/{})", cosmos.database_name, cosmos.container_name)
        }
        Some(ref cosmos) => match cosmos.connection() {
            Ok(Some(connection)) => format!(
                "Cosmos DB: {} ({}/{}, key ***)",
                connection.endpoint, cosmos.database_name, cosmos.container_name
            ),
            Ok(None) => "Cosmos DB: not configured (walkthrough skipped)".to_string(),
            Err(e) => format!("Cosmos DB: invalid connection settings ({e})"),
        },
        None => "Cosmos DB: not configured (walkthrough skipped)".to_string(),
    });

    lines.push(match config.storage {
        Some(ref storage) if storage.backend == Backend::Memory => {
            format!("Blob Storage: in-memory ({})", storage.container_name)
        }
        Some(ref storage) => match storage.service_endpoint() {
            Some(endpoint) => format!("Blob Storage: {endpoint} ({})", storage.container_name),
            None => "Blob Storage: not configured (walkthrough skipped)".to_string(),
        },
        None => "Blob Storage: not configured (walkthrough skipped)".to_string(),
    });

    lines.push(match config.keyvault {
        Some(ref keyvault) if keyvault.backend == Backend::Memory => {
            format!("Key Vault: in-memory (prefix {})", keyvault.secret_prefix)
        }
        Some(ref keyvault) if !is_unset(keyvault.vault_uri.as_deref()) => format!(
            "Key Vault: {} (prefix {})",
            keyvault.vault_uri.as_deref().unwrap_or_default(),
            keyvault.secret_prefix
        ),
        _ => "Key Vault: not configured (walkthrough skipped)".to_string(),
    });

    lines.push(match config.servicebus {
        Some(ref bus) if is_unset(bus.queue_name.as_deref()) => {
            "Service Bus: no queue configured (walkthrough skipped)".to_string()
        }
        Some(ref bus) if bus.backend == Backend::Memory => format!(
            "Service Bus: in-memory queue {} ({} messages, {} in flight)",
            bus.queue_name.as_deref().unwrap_or_default(),
            bus.message_count,
            bus.max_parallelism
        ),
        Some(ref bus) if !is_unset(bus.namespace_uri.as_deref()) => format!(
            "Service Bus: {} queue {} ({} messages, {} in flight)",
            bus.namespace_uri.as_deref().unwrap_or_default(),
            bus.queue_name.as_deref().unwrap_or_default(),
            bus.message_count,
            bus.max_parallelism
        ),
        _ => "Service Bus: not configured (walkthrough skipped)".to_string(),
    });

    lines.push(format!(
        "Local Logging: {}",
        if config.logging.local_enabled {
            format!("{} ({})", config.logging.local_path, config.logging.local_rotation)
        } else {
            "disabled".to_string()
        }
    ));
    lines
}
