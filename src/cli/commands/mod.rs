//! CLI command implementations
//!
//! Exit codes shared by every command:
//!
//! - `0` success, or the walkthrough was skipped because its connection
//!   settings are not set
//! - `1` the walkthrough finished but some calls failed
//! - `2` configuration error
//! - `5` fatal error
//! - `130` interrupted by SIGINT/SIGTERM

pub mod blobs;
pub mod documents;
pub mod init;
pub mod schedule;
pub mod secrets;
pub mod validate;

use crate::config::{ConfigLoader, LayeredConfig};
use crate::domain::AzLearnError;

/// Loads the layered configuration, printing the failure if there is one
pub(crate) fn load_or_report(loader: &ConfigLoader) -> Option<LayeredConfig> {
    match loader.load() {
        Ok(layered) => Some(layered),
        Err(e) => {
            tracing::error!(
                error = %e,
                config_path = %loader.path().display(),
                "Failed to load configuration"
            );
            eprintln!("❌ Failed to load configuration file: {}", loader.path().display());
            eprintln!("   Error: {e}");
            None
        }
    }
}

/// Prints why a walkthrough did not run; the command still succeeds
pub(crate) fn report_not_configured(service: &str, setting: &str) -> i32 {
    tracing::warn!(service, setting, "Connection settings not set, skipping walkthrough");
    println!("Please set {setting} for {service}.");
    0
}

/// Exit code for a walkthrough that returned an error
pub(crate) fn failure_exit_code(error: &AzLearnError) -> i32 {
    match error {
        AzLearnError::Cancelled => {
            println!("⚠️  Interrupted by shutdown signal.");
            130 // SIGINT exit code (standard Unix convention)
        }
        AzLearnError::Configuration(_) => 2, // Configuration error exit code
        _ => 5,                              // Fatal error exit code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_failure_exit_codes() {
        assert_eq!(failure_exit_code(&AzLearnError::Cancelled), 130);
        assert_eq!(
            failure_exit_code(&AzLearnError::Configuration("bad".to_string())),
            2
        );
        assert_eq!(failure_exit_code(&AzLearnError::not_found("gone")), 5);
    }

    #[test]
    fn test_report_not_configured_succeeds() {
        assert_eq!(report_not_configured("Cosmos DB", "cosmosdb.connection_string"), 0);
    }

    #[test]
    fn test_load_or_report() {
        let missing = ConfigLoader::new("/nonexistent/azlearn.toml");
        let layered = load_or_report(&missing).unwrap();
        assert!(layered.config().cosmosdb.is_none());
        assert!(load_or_report(&missing.require_file(true)).is_none());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[application]\nlog_level = \"debug\"").unwrap();
        let layered = load_or_report(&ConfigLoader::new(file.path())).unwrap();
        assert_eq!(layered.config().application.log_level, "debug");
    }
}
