//! Secret store abstraction

use crate::domain::{AzLearnError, Result};
use async_trait::async_trait;

/// Named string secrets
///
/// Implemented by [`super::KeyVaultSecretStore`] and [`super::MemorySecretStore`].
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the current value of a secret
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` request error when the secret does not exist.
    async fn get_secret(&self, name: &str) -> Result<String>;

    /// Creates the secret or adds a new version with `value`
    async fn set_secret(&self, name: &str, value: &str) -> Result<()>;

    /// Names of every secret in the store
    async fn list_secret_names(&self) -> Result<Vec<String>>;
}

/// Checks a secret name against the vault naming rules
///
/// Names are 1-127 characters of ASCII letters, digits and `-`.
pub fn validate_secret_name(name: &str) -> Result<()> {
    let valid = (1..=127).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AzLearnError::Validation(format!(
            "Secret name '{name}' must be 1-127 letters, digits or '-'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("KeyOnline01", true)]
    #[test_case("LearnKeyVault-Section--Key", true)]
    #[test_case("", false)]
    #[test_case("has_underscore", false)]
    #[test_case("has.dot", false)]
    fn test_validate_secret_name(name: &str, ok: bool) {
        assert_eq!(validate_secret_name(name).is_ok(), ok);
    }
}
