//! Object store adapters
//!
//! - [`BlobRestStore`] - Azure Blob Storage REST API
//! - [`MemoryObjectStore`] - in-process store for tests and offline runs

pub mod memory;
pub mod rest;
pub mod traits;

pub use memory::MemoryObjectStore;
pub use rest::BlobRestStore;
pub use traits::ObjectStore;
