//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "azlearn.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing AzLearn configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Replace every <TO_BE_SET> in {} you want to use", self.output);
                println!("     (sections left as <TO_BE_SET> are skipped)");
                println!("  2. Set the [credential] values (${{AZURE_CLIENT_SECRET}} style");
                println!("     references are read from the environment or a .env file),");
                println!("     or sign in with `az login`");
                println!("  3. Validate configuration: azlearn validate-config");
                println!("  4. Run a walkthrough, e.g. azlearn documents");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# AzLearn Configuration File
# Azure service client walkthroughs

Key01 = "Key01 from azlearn.toml"
Key02 = "Key02 from azlearn.toml"
KeySample = "KeySample from azlearn.toml"

[application]
log_level = "info"
environment = "development"

[credential]
tenant_id = "<TO_BE_SET>"
client_id = "<TO_BE_SET>"
client_secret = "<TO_BE_SET>"

[cosmosdb]
connection_string = "<TO_BE_SET>"
database_name = "CARE"
container_name = "PhoneStatusInfo"

[storage]
account_name = "<TO_BE_SET>"
container_name = "learn-azure-storage"

[keyvault]
vault_uri = "<TO_BE_SET>"
secret_prefix = "LearnKeyVault"

[servicebus]
namespace_uri = "<TO_BE_SET>"
queue_name = "<TO_BE_SET>"

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# AzLearn Configuration File
# Azure service client walkthroughs
#
# Every service section is optional. A walkthrough whose connection settings
# are missing or still hold <TO_BE_SET> is skipped with exit code 0.
#
# Layers, later wins:
#   1. this file (${VAR} references are substituted from the environment)
#   2. azlearn.{environment}.toml next to it, if present
#   3. AZLEARN_* environment variables, e.g. AZLEARN_COSMOSDB__DATABASE_NAME
#   4. --set key=value on the command line
#   5. Key Vault secrets named {secret_prefix}-Key01 (secrets command only)

# ============================================================================
# Free-form settings read by the secrets walkthrough
# ============================================================================
# A vault secret named LearnKeyVault-Key01 overrides Key01 below.
Key01 = "Key01 from azlearn.toml"
Key02 = "Key02 from azlearn.toml"
KeySample = "KeySample from azlearn.toml"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Selects the azlearn.{environment}.toml overlay (development, staging, production)
environment = "development"

# Timeout for every REST call, in seconds
http_timeout_seconds = 30

# ============================================================================
# Credentials
# ============================================================================
[credential]
# Values may reference the environment, e.g. tenant_id = "${AZURE_TENANT_ID}"
tenant_id = "<TO_BE_SET>"
client_id = "<TO_BE_SET>"
client_secret = "<TO_BE_SET>"

# Tried in order; the first one that yields a token wins
chain = ["client_secret", "managed_identity", "azure_cli"]

# ============================================================================
# Cosmos DB
# ============================================================================
[cosmosdb]
# "azure" talks to the service, "memory" runs against an in-process store
backend = "azure"

# Either a connection string...
connection_string = "<TO_BE_SET>"
# ...or an endpoint and key
# endpoint = "https://your-account.documents.azure.com:443/"
# key = "${COSMOS_KEY}"

database_name = "CARE"
container_name = "PhoneStatusInfo"
partition_key_path = "/phone"

# Container default TTL: -1 lets documents opt in with their own ttl
default_ttl = -1

# The document for this phone is created with a ttl and expires
ttl_phone = "6268889999"
ttl_seconds = 120

# Documents per query page
query_page_size = 100

[workflow]
# Pause between document steps, in milliseconds
step_delay_ms = 0

# Remove history[1] after the second patch
remove_history_entry = false

# Delete the documents created in this session at the end
delete_created = false

# ============================================================================
# Blob Storage
# ============================================================================
[storage]
backend = "azure"
account_name = "<TO_BE_SET>"
# endpoint = "https://youraccount.blob.core.windows.net"
container_name = "learn-azure-storage"
blob_name = "test-object.json"

# ============================================================================
# Key Vault
# ============================================================================
[keyvault]
backend = "azure"
vault_uri = "<TO_BE_SET>"

# Secrets named {secret_prefix}-{key} are layered into this configuration;
# "--" inside the key nests it and "-" stands for "_",
# e.g. LearnKeyVault-cosmosdb--database-name sets cosmosdb.database_name
secret_prefix = "LearnKeyVault"

# Created with the current timestamp when missing
bootstrap_secret = "KeyOnline01"

load_configuration = true

# ============================================================================
# Service Bus
# ============================================================================
[servicebus]
backend = "azure"
namespace_uri = "<TO_BE_SET>"
queue_name = "<TO_BE_SET>"

# Messages to schedule, calls in flight and delivery delay
message_count = 5500
max_parallelism = 32
delay_seconds = 10

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "./logs"

# Rotation strategy (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "azlearn.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "azlearn.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[application]"));
        assert!(config.contains("[cosmosdb]"));
        assert!(config.contains("<TO_BE_SET>"));
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("# AzLearn Configuration File"));
        assert!(config.contains("message_count"));
        assert!(config.contains("KeySample"));
    }

    #[tokio::test]
    async fn test_generated_files_load() {
        let dir = tempfile::tempdir().unwrap();
        for with_examples in [false, true] {
            let path = dir.path().join(format!("azlearn-{with_examples}.toml"));
            let args = InitArgs {
                output: path.display().to_string(),
                with_examples,
                force: false,
            };
            assert_eq!(args.execute().await.unwrap(), 0);

            let layered = ConfigLoader::new(&path).load().unwrap();
            assert_eq!(
                layered.get_string("Key01").as_deref(),
                Some("Key01 from azlearn.toml")
            );
            assert!(layered.config().cosmosdb.as_ref().unwrap().connection().unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_existing_file_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(&path, "# keep\n").unwrap();

        let mut args = InitArgs {
            output: path.display().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# keep\n");

        args.force = true;
        assert_eq!(args.execute().await.unwrap(), 0);
    }
}
