//! Domain models and types for AzLearn.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Validated identifiers** ([`DocumentId`], [`PartitionKeyValue`])
//! - **The phone status document** ([`PhoneStatusInfo`]) and its history rows
//! - **Patch operations** ([`PatchOperation`]) with in-process JSON pointer semantics
//! - **Response wrappers** carrying the request charge ([`ItemResponse`], [`QueryPage`])
//! - **Error types** ([`AzLearnError`], [`RequestError`]) and the [`Result`] alias
//!
//! ```rust
//! use azlearn::domain::{PartitionKeyValue, PatchOperation, PhoneStatus, PhoneStatusInfo};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = PhoneStatusInfo::builder()
//!     .phone(PartitionKeyValue::new("16281230101")?)
//!     .line_of_biz("Biz-A")
//!     .status(PhoneStatus::Black)
//!     .build()?;
//!
//! let ops = vec![
//!     PatchOperation::set("/status", PhoneStatus::Grey)?,
//!     PatchOperation::remove("/history/1"),
//! ];
//! # let _ = (doc, ops);
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod container;
pub mod errors;
pub mod ids;
pub mod message;
pub mod patch;
pub mod phone;
pub mod response;
pub mod result;

// Re-export commonly used types for convenience
pub use blob::{normalize_metadata, BlobHttpHeaders, BlobMessage, BlobMetadata, BlobProperties};
pub use container::{ContainerSpec, TtlSetting};
pub use errors::{AzLearnError, ErrorKind, RequestError};
pub use ids::{DocumentId, PartitionKeyValue};
pub use message::{DemoPayload, ScheduledMessage};
pub use patch::PatchOperation;
pub use phone::{PhoneStatus, PhoneStatusInfo, PhoneStatusInfoBuilder, PhoneStatusRow};
pub use response::{DeleteResponse, ItemResponse, QueryPage, RequestCharge};
pub use result::Result;
