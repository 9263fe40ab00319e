//! Message bus abstraction

use crate::domain::{Result, ScheduledMessage};
use async_trait::async_trait;

/// Entry point for sending to a queue
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Opens a sender bound to `queue`
    async fn create_sender(&self, queue: &str) -> Result<Box<dyn MessageSender>>;
}

/// A sender bound to one queue
///
/// Callers close every sender they open, including after a failed send.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Enqueues `message` for delivery no earlier than its
    /// `scheduled_enqueue_time`
    ///
    /// Returns the sequence number when the service reports one.
    async fn schedule_message(&self, message: &ScheduledMessage) -> Result<Option<i64>>;

    /// Releases the sender; further sends fail
    async fn close(&mut self) -> Result<()>;
}
