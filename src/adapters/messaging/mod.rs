//! Message bus adapters
//!
//! - [`ServiceBusRestBus`] - Azure Service Bus REST API
//! - [`MemoryMessageBus`] - in-process bus for tests and offline runs

pub mod memory;
pub mod servicebus;
pub mod traits;

pub use memory::{EnqueuedMessage, MemoryMessageBus};
pub use servicebus::ServiceBusRestBus;
pub use traits::{MessageBus, MessageSender};
