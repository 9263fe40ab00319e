//! Object store value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard HTTP headers stored with a blob
///
/// Setting headers replaces all of them: a field left `None` is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHttpHeaders {
    pub content_type: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    /// Base64 MD5 of the content
    pub content_hash: Option<String>,
}

/// User-defined blob metadata, kept sorted for stable output
///
/// Names are case-insensitive. They travel as HTTP headers, which come back
/// lowercased, so stores report them in lowercase.
pub type BlobMetadata = BTreeMap<String, String>;

/// Metadata with every name lowercased, as a store reports it
pub fn normalize_metadata(metadata: &BlobMetadata) -> BlobMetadata {
    metadata
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// Properties returned for an existing blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobProperties {
    pub headers: BlobHttpHeaders,
    pub metadata: BlobMetadata,
    pub content_length: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Payload uploaded by the blob walkthrough
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMessage {
    pub text: String,
    pub date_created: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_camel_case() {
        let msg = BlobMessage {
            text: "this is a test json object".to_string(),
            date_created: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("dateCreated").is_some());
        assert_eq!(value["text"], "this is a test json object");
    }

    #[test]
    fn test_normalize_metadata_lowercases_names() {
        let mut metadata = BlobMetadata::new();
        metadata.insert("docSid".to_string(), "DOC202503030001".to_string());
        let normalized = normalize_metadata(&metadata);
        assert_eq!(normalized.get("docsid").map(String::as_str), Some("DOC202503030001"));
        assert!(!normalized.contains_key("docSid"));
    }
}
