//! Container definition for the document store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default time-to-live for documents in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtlSetting {
    /// Expiry is disabled; per-document `ttl` is ignored
    #[default]
    Off,
    /// Expiry is enabled but documents live forever unless they set `ttl`
    NoDefault,
    /// Documents expire this many seconds after their last write unless
    /// they set their own `ttl`
    Seconds(u32),
}

impl TtlSetting {
    /// Parses the service's integer encoding (`None` = off, `-1`, or `n > 0`)
    pub fn from_raw(raw: Option<i64>) -> Result<Self, String> {
        match raw {
            None => Ok(TtlSetting::Off),
            Some(-1) => Ok(TtlSetting::NoDefault),
            Some(n) if n > 0 => u32::try_from(n)
                .map(TtlSetting::Seconds)
                .map_err(|_| format!("Default TTL {n} is too large")),
            Some(n) => Err(format!("Default TTL must be -1 or positive, got {n}")),
        }
    }

    /// The service's integer encoding
    pub fn as_raw(&self) -> Option<i64> {
        match self {
            TtlSetting::Off => None,
            TtlSetting::NoDefault => Some(-1),
            TtlSetting::Seconds(n) => Some(i64::from(*n)),
        }
    }

    /// Effective lifetime in seconds for a document carrying `document_ttl`
    ///
    /// Returns `None` when the document never expires.
    pub fn effective_ttl(&self, document_ttl: Option<i64>) -> Option<i64> {
        match self {
            TtlSetting::Off => None,
            TtlSetting::NoDefault => document_ttl.filter(|t| *t > 0),
            TtlSetting::Seconds(default) => match document_ttl {
                Some(-1) => None,
                Some(t) if t > 0 => Some(t),
                _ => Some(i64::from(*default)),
            },
        }
    }
}

impl fmt::Display for TtlSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlSetting::Off => f.write_str("off"),
            TtlSetting::NoDefault => f.write_str("-1"),
            TtlSetting::Seconds(n) => write!(f, "{n}s"),
        }
    }
}

impl Serialize for TtlSetting {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TtlSetting {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<i64>::deserialize(deserializer)?;
        TtlSetting::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

/// Definition used to create a container if it does not exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name
    pub id: String,

    /// JSON pointer of the partition key property, e.g. `/phone`
    pub partition_key_path: String,

    /// Default document lifetime
    #[serde(default)]
    pub default_ttl: TtlSetting,
}

impl ContainerSpec {
    /// Creates a container definition
    pub fn new(
        id: impl Into<String>,
        partition_key_path: impl Into<String>,
        default_ttl: TtlSetting,
    ) -> Result<Self, String> {
        let id = id.into();
        let partition_key_path = partition_key_path.into();
        if id.trim().is_empty() {
            return Err("Container id cannot be empty".to_string());
        }
        if !partition_key_path.starts_with('/') || partition_key_path.len() < 2 {
            return Err(format!(
                "Partition key path '{partition_key_path}' must look like '/property'"
            ));
        }
        Ok(Self {
            id,
            partition_key_path,
            default_ttl,
        })
    }

    /// Property name addressed by the partition key path
    pub fn partition_key_property(&self) -> &str {
        self.partition_key_path.trim_start_matches('/')
    }
}
