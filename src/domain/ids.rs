//! Document addressing newtypes
//!
//! A document is addressed by its id plus the value of its partition key.
//! Both must be non-empty for any point operation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use azlearn::domain::ids::DocumentId;
/// use std::str::FromStr;
///
/// let id = DocumentId::from_str("6f1c1f43-55c4-4bd6-9d0c-93c2d6a2a0f7").unwrap();
/// assert_eq!(id.as_str(), "6f1c1f43-55c4-4bd6-9d0c-93c2d6a2a0f7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new DocumentId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Document ID cannot be empty".to_string());
        }
        if id.contains(['/', '\\', '?', '#']) {
            return Err(format!(
                "Document ID '{id}' contains a reserved character (/, \\, ? or #)"
            ));
        }
        Ok(Self(id))
    }

    /// Generates a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Partition key value newtype wrapper
///
/// Holds the value found at the container's partition key path
/// (for phone status documents, the `phone` property).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKeyValue(String);

impl PartitionKeyValue {
    /// Creates a new partition key value, rejecting blank values
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("Partition key value cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    /// Returns the value as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PartitionKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PartitionKeyValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PartitionKeyValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_valid() {
        let id = DocumentId::new("abc-123").unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn test_document_id_rejects_blank_and_reserved() {
        assert!(DocumentId::new("").is_err());
        assert!(DocumentId::new("   ").is_err());
        assert!(DocumentId::new("a/b").is_err());
        assert!(DocumentId::new("a#b").is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_partition_key_value() {
        let pk = PartitionKeyValue::from_str("6268889999").unwrap();
        assert_eq!(pk.as_ref(), "6268889999");
        assert!(PartitionKeyValue::new("").is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = DocumentId::new("x1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"x1\"");
        let back: PartitionKeyValue = serde_json::from_str("\"555\"").unwrap();
        assert_eq!(back.as_str(), "555");
    }
}
