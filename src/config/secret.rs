//! Secret setting values
//!
//! Account keys, connection strings and client secrets are held in
//! `secrecy::Secret` so they are zeroized on drop and redacted from `Debug`
//! output. Code that needs the raw value calls [`expose_str`].
//!
//! ```rust
//! use azlearn::config::{expose_str, secret_string};
//!
//! let key = secret_string("account-key".to_string());
//! assert_eq!(expose_str(&key), "account-key");
//! assert!(!format!("{key:?}").contains("account-key"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload that satisfies the bounds `Secret` needs
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split the secret value by a delimiter
    pub fn split(&self, delimiter: char) -> std::str::Split<'_, char> {
        self.0.split(delimiter)
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A zeroizing, redacted string setting
pub type SecretString = Secret<SecretValue>;

/// Wraps a string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Borrows the raw value of a [`SecretString`]
#[inline]
pub fn expose_str(secret: &SecretString) -> &str {
    secret.expose_secret().as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("test-key".to_string());
        assert_eq!(expose_str(&secret), "test-key");
        assert!(!secret.expose_secret().is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("sensitive-data"));
    }

    #[test]
    fn test_secret_serde() {
        #[derive(Serialize, Deserialize)]
        struct Section {
            key: SecretString,
        }

        let section: Section = toml::from_str("key = \"abc==\"").unwrap();
        assert_eq!(expose_str(&section.key), "abc==");

        let json = serde_json::to_string(&section).unwrap();
        assert!(json.contains("abc=="));
    }
}
