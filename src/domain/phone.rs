//! Phone status document model
//!
//! The document stored by the Cosmos DB walkthrough. Property names are
//! camelCase on the wire and `status` is stored as its integer value.

use super::ids::{DocumentId, PartitionKeyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition key path of the phone status container
pub const PHONE_PARTITION_KEY_PATH: &str = "/phone";

/// Screening status of a phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PhoneStatus {
    /// Not flagged
    #[default]
    Clear,
    /// Under observation
    Grey,
    /// Blocked
    Black,
}

impl From<PhoneStatus> for u8 {
    fn from(status: PhoneStatus) -> Self {
        match status {
            PhoneStatus::Clear => 0,
            PhoneStatus::Grey => 1,
            PhoneStatus::Black => 2,
        }
    }
}

impl TryFrom<u8> for PhoneStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PhoneStatus::Clear),
            1 => Ok(PhoneStatus::Grey),
            2 => Ok(PhoneStatus::Black),
            other => Err(format!("Invalid phone status {other}. Must be 0, 1 or 2")),
        }
    }
}

impl fmt::Display for PhoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhoneStatus::Clear => "Clear",
            PhoneStatus::Grey => "Grey",
            PhoneStatus::Black => "Black",
        };
        f.write_str(name)
    }
}

/// One entry of a document's status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneStatusRow {
    /// Status recorded by this entry
    pub status: PhoneStatus,

    /// When the status was recorded
    pub create_date: DateTime<Utc>,
}

impl PhoneStatusRow {
    /// Creates a history row
    pub fn new(status: PhoneStatus, create_date: DateTime<Utc>) -> Self {
        Self {
            status,
            create_date,
        }
    }
}

/// Phone status document
///
/// # Examples
///
/// ```
/// use azlearn::domain::phone::{PhoneStatus, PhoneStatusInfo};
/// use azlearn::domain::ids::PartitionKeyValue;
///
/// let doc = PhoneStatusInfo::builder()
///     .phone(PartitionKeyValue::new("6268889999").unwrap())
///     .line_of_biz("Biz-A")
///     .status(PhoneStatus::Black)
///     .build()
///     .unwrap();
/// assert_eq!(doc.history.len(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneStatusInfo {
    /// Document id
    pub id: DocumentId,

    /// Phone number, also the partition key
    pub phone: PartitionKeyValue,

    /// Line of business classification
    #[serde(default)]
    pub line_of_biz: Option<String>,

    /// Free-text annotation
    #[serde(default)]
    pub comment: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: PhoneStatus,

    /// Creation timestamp
    pub create_date: DateTime<Utc>,

    /// Status history, newest entries first by convention
    #[serde(default)]
    pub history: Vec<PhoneStatusRow>,

    /// Seconds to live after the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

impl PhoneStatusInfo {
    /// Creates a new builder
    pub fn builder() -> PhoneStatusInfoBuilder {
        PhoneStatusInfoBuilder::default()
    }
}

/// Builder for [`PhoneStatusInfo`]
#[derive(Debug, Default)]
pub struct PhoneStatusInfoBuilder {
    id: Option<DocumentId>,
    phone: Option<PartitionKeyValue>,
    line_of_biz: Option<String>,
    comment: Option<String>,
    status: PhoneStatus,
    create_date: Option<DateTime<Utc>>,
    history: Vec<PhoneStatusRow>,
    ttl: Option<i64>,
}

impl PhoneStatusInfoBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document id (a fresh UUID is generated otherwise)
    pub fn id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the phone number
    pub fn phone(mut self, phone: PartitionKeyValue) -> Self {
        self.phone = Some(phone);
        self
    }

    /// Sets the line of business
    pub fn line_of_biz(mut self, line_of_biz: impl Into<String>) -> Self {
        self.line_of_biz = Some(line_of_biz.into());
        self
    }

    /// Sets the comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the status
    pub fn status(mut self, status: PhoneStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the creation timestamp (defaults to now)
    pub fn create_date(mut self, create_date: DateTime<Utc>) -> Self {
        self.create_date = Some(create_date);
        self
    }

    /// Appends a history row
    pub fn history_row(mut self, row: PhoneStatusRow) -> Self {
        self.history.push(row);
        self
    }

    /// Replaces the history
    pub fn history(mut self, history: Vec<PhoneStatusRow>) -> Self {
        self.history = history;
        self
    }

    /// Sets the time-to-live in seconds
    pub fn ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Builds the document
    ///
    /// # Errors
    ///
    /// Returns an error if the phone is missing or the ttl is neither
    /// positive nor -1
    pub fn build(self) -> Result<PhoneStatusInfo, String> {
        if let Some(ttl) = self.ttl {
            if ttl == 0 || ttl < -1 {
                return Err(format!("ttl must be a positive number of seconds or -1, got {ttl}"));
            }
        }

        Ok(PhoneStatusInfo {
            id: self.id.unwrap_or_else(DocumentId::generate),
            phone: self.phone.ok_or("phone is required")?,
            line_of_biz: self.line_of_biz,
            comment: self.comment,
            status: self.status,
            create_date: self.create_date.unwrap_or_else(Utc::now),
            history: self.history,
            ttl: self.ttl,
        })
    }
}
