//! Layered configuration loader
//!
//! Layers, lowest precedence first:
//!
//! 1. the base TOML file
//! 2. the optional `{stem}.{environment}.toml` overlay next to it
//! 3. `AZLEARN_*` environment variables, `__` separating nested keys
//!    (`AZLEARN_COSMOSDB__ENDPOINT` sets `cosmosdb.endpoint`)
//! 4. `--set key=value` command-line overrides
//! 5. Key Vault secrets, when a [`KeyVaultSource`] is attached
//!
//! Both TOML files go through `${VAR}` substitution before parsing. The base
//! file is optional unless [`ConfigLoader::require_file`] is set, so a run
//! configured entirely through the environment or `--set` needs no file.

use super::schema::{AzLearnConfig, Environment};
use super::vault::KeyVaultSource;
use crate::domain::errors::AzLearnError;
use crate::domain::result::Result;
use config::{Config, File, FileFormat};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Default prefix of environment variable overrides
pub const ENV_PREFIX: &str = "AZLEARN";

/// Loads and validates configuration from a TOML file plus environment
///
/// # Errors
///
/// Returns an error if the file is missing or cannot be parsed, a
/// referenced `${VAR}` is not set, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use azlearn::config::loader::load_config;
///
/// let config = load_config("azlearn.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AzLearnConfig> {
    Ok(ConfigLoader::new(path).require_file(true).load()?.into_config())
}

/// Builder for a [`LayeredConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    env_prefix: String,
    overrides: Vec<(String, String)>,
    vault: Option<KeyVaultSource>,
    file_required: bool,
}

impl ConfigLoader {
    /// Starts a loader for the given base file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            env_prefix: ENV_PREFIX.to_string(),
            overrides: Vec::new(),
            vault: None,
            file_required: false,
        }
    }

    /// Fails the load when the base file does not exist
    pub fn require_file(mut self, required: bool) -> Self {
        self.file_required = required;
        self
    }

    /// Changes the environment variable prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Adds a single `key = value` override
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Adds `key=value` overrides as given on the command line
    ///
    /// # Errors
    ///
    /// Returns an error if an entry has no `=` or an empty key
    pub fn with_cli_overrides<S: AsRef<str>>(mut self, entries: &[S]) -> Result<Self> {
        for entry in entries {
            let (key, value) = parse_override(entry.as_ref())?;
            self.overrides.push((key, value));
        }
        Ok(self)
    }

    /// Layers Key Vault secrets on top of every other source
    pub fn with_vault(mut self, vault: KeyVaultSource) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Path of the base file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every layer, deserializes and validates
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the failing layer or setting
    pub fn load(&self) -> Result<LayeredConfig> {
        let base = if self.file_required || self.path.exists() {
            read_substituted(&self.path)?
        } else {
            tracing::debug!(
                config_path = %self.path.display(),
                "Configuration file not found, using defaults and overrides"
            );
            String::new()
        };
        let environment = self.environment(&base)?;

        let mut builder = Config::builder().add_source(File::from_str(&base, FileFormat::Toml));

        let overlay_path = overlay_path(&self.path, &environment);
        if overlay_path.exists() {
            let overlay = read_substituted(&overlay_path)?;
            builder = builder.add_source(File::from_str(&overlay, FileFormat::Toml));
            tracing::debug!(overlay = %overlay_path.display(), "Applied environment overlay");
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in &self.overrides {
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }

        if let Some(ref vault) = self.vault {
            for (key, value) in vault.entries() {
                builder = builder.set_override(key.as_str(), value.as_str())?;
            }
        }

        let raw = builder.build().map_err(|e| {
            AzLearnError::Configuration(format!(
                "Failed to load configuration from {}: {e}",
                self.path.display()
            ))
        })?;

        let config: AzLearnConfig = raw
            .clone()
            .try_deserialize()
            .map_err(|e| {
                AzLearnError::Configuration(format!("Failed to parse configuration: {e}"))
            })?;

        config.validate().map_err(|e| {
            AzLearnError::Configuration(format!("Configuration validation failed: {e}"))
        })?;

        Ok(LayeredConfig { raw, config })
    }

    /// Environment name from `{prefix}_ENVIRONMENT` or the base file
    fn environment(&self, base: &str) -> Result<String> {
        if let Ok(env) = std::env::var(format!("{}_ENVIRONMENT", self.env_prefix)) {
            if !env.trim().is_empty() {
                return Ok(env.trim().to_lowercase());
            }
        }
        let value: toml::Value = toml::from_str(base)?;
        let env = value
            .get("application")
            .and_then(|app| app.get("environment"))
            .and_then(|env| env.as_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| Environment::default().as_str().to_string());
        Ok(env)
    }
}

/// Validated configuration plus the raw merged layers
///
/// The raw layers answer lookups for keys outside the typed schema, such as
/// the free-form `Key01` settings read by the secrets walkthrough.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    raw: Config,
    config: AzLearnConfig,
}

impl LayeredConfig {
    /// Typed configuration
    pub fn config(&self) -> &AzLearnConfig {
        &self.config
    }

    /// Consumes self and returns the typed configuration
    pub fn into_config(self) -> AzLearnConfig {
        self.config
    }

    /// Looks up any dotted key as a string
    ///
    /// Environment variables arrive lowercased, so a miss on the exact key
    /// is retried in lowercase.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.raw
            .get_string(key)
            .ok()
            .or_else(|| self.raw.get_string(&key.to_lowercase()).ok())
    }
}

/// Path of the environment overlay for `base`
pub fn overlay_path(base: &Path, environment: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "azlearn".to_string());
    let file_name = format!("{stem}.{environment}.toml");
    match base.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Splits a `key=value` command-line override
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty
pub fn parse_override(entry: &str) -> Result<(String, String)> {
    let (key, value) = entry.split_once('=').ok_or_else(|| {
        AzLearnError::Configuration(format!("Override '{entry}' must look like key=value"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(AzLearnError::Configuration(format!(
            "Override '{entry}' has an empty key"
        )));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn read_substituted(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(AzLearnError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AzLearnError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    substitute_env_vars(&contents)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| AzLearnError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(AzLearnError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Backend;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("AZLEARN_TEST_SUBST_VAR", "test_value");
        let input = "key = \"${AZLEARN_TEST_SUBST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "key = \"test_value\"\n");
        std::env::remove_var("AZLEARN_TEST_SUBST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("AZLEARN_TEST_MISSING_VAR");
        let input = "key = \"${AZLEARN_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("AZLEARN_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# key = \"${AZLEARN_TEST_NEVER_SET}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-azlearn.toml");
        assert!(matches!(result, Err(AzLearnError::Configuration(_))));
    }

    #[test]
    fn test_missing_file_is_optional_by_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("azlearn.toml");

        let layered = ConfigLoader::new(&path)
            .with_env_prefix("AZLEARN_TEST_NO_FILE")
            .with_override("servicebus.queue_name", "from-set")
            .load()
            .unwrap();
        assert_eq!(layered.config().application.log_level, "info");
        assert_eq!(
            layered.config().servicebus.as_ref().unwrap().queue_name.as_deref(),
            Some("from-set")
        );

        let err = ConfigLoader::new(&path).require_file(true).load().unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("cosmosdb.backend=memory").unwrap(),
            ("cosmosdb.backend".to_string(), "memory".to_string())
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn test_overlay_path() {
        let path = overlay_path(Path::new("/etc/azlearn/azlearn.toml"), "staging");
        assert_eq!(path, PathBuf::from("/etc/azlearn/azlearn.staging.toml"));
    }

    #[test]
    fn test_load_layers() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("azlearn.toml");
        fs::write(
            &base,
            r#"
Key01 = "from-file"
Key02 = "file-only"

[application]
log_level = "info"
environment = "staging"

[cosmosdb]
backend = "azure"
database_name = "CARE"
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("azlearn.staging.toml"),
            "[cosmosdb]\ndatabase_name = \"CARE_STAGING\"\n",
        )
        .unwrap();

        let layered = ConfigLoader::new(&base)
            .with_env_prefix("AZLEARN_TEST_LAYERS")
            .with_cli_overrides(&["cosmosdb.backend=memory"])
            .unwrap()
            .load()
            .unwrap();

        let cosmos = layered.config().cosmosdb.as_ref().unwrap();
        assert_eq!(cosmos.database_name, "CARE_STAGING");
        assert_eq!(cosmos.backend, Backend::Memory);
        assert_eq!(layered.get_string("Key01").as_deref(), Some("from-file"));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[servicebus]
backend = "memory"
queue_name = "learn"
message_count = 10
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        let bus = config.servicebus.unwrap();
        assert_eq!(bus.message_count, 10);
        assert_eq!(bus.delay_seconds, 10);
    }

    #[test]
    fn test_load_config_invalid_value() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[application]\nlog_level = \"loud\"\n")
            .unwrap();
        temp_file.flush().unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }
}
