//! In-process message bus

use super::traits::{MessageBus, MessageSender};
use crate::domain::{AzLearnError, ErrorKind, RequestError, Result, ScheduledMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A message accepted by the bus
#[derive(Debug, Clone)]
pub struct EnqueuedMessage {
    pub sequence_number: i64,
    pub queue: String,
    pub message: ScheduledMessage,
}

#[derive(Debug, Default)]
struct BusState {
    queues: Mutex<HashMap<String, Vec<EnqueuedMessage>>>,
    next_sequence: AtomicI64,
    calls: AtomicUsize,
    open_senders: AtomicUsize,
    peak_open_senders: AtomicUsize,
    senders_created: AtomicUsize,
    senders_closed: AtomicUsize,
    fail_every: AtomicUsize,
}

/// Message bus kept in memory
///
/// Counts open senders so callers can check that every sender was closed
/// and how many were in flight at once.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageBus {
    state: Arc<BusState>,
}

impl MemoryMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `n`-th schedule call fail with a transient error
    pub fn fail_every(self, n: usize) -> Self {
        self.state.fail_every.store(n, Ordering::SeqCst);
        self
    }

    /// Messages in `queue` that may be delivered at `now`
    pub async fn due_messages(&self, queue: &str, now: DateTime<Utc>) -> Vec<EnqueuedMessage> {
        self.state
            .queues
            .lock()
            .await
            .get(queue)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.message.is_due(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of messages accepted for `queue`
    pub async fn scheduled_count(&self, queue: &str) -> usize {
        self.state.queues.lock().await.get(queue).map_or(0, Vec::len)
    }

    /// Senders currently open
    pub fn open_senders(&self) -> usize {
        self.state.open_senders.load(Ordering::SeqCst)
    }

    /// Most senders that were open at the same time
    pub fn peak_open_senders(&self) -> usize {
        self.state.peak_open_senders.load(Ordering::SeqCst)
    }

    /// Senders created so far
    pub fn senders_created(&self) -> usize {
        self.state.senders_created.load(Ordering::SeqCst)
    }

    /// Senders closed explicitly, not counting ones that were only dropped
    pub fn senders_closed(&self) -> usize {
        self.state.senders_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for MemoryMessageBus {
    async fn create_sender(&self, queue: &str) -> Result<Box<dyn MessageSender>> {
        if queue.trim().is_empty() {
            return Err(AzLearnError::Validation("Queue name cannot be empty".to_string()));
        }
        let open = self.state.open_senders.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_open_senders.fetch_max(open, Ordering::SeqCst);
        self.state.senders_created.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySender {
            queue: queue.to_string(),
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemorySender {
    queue: String,
    state: Arc<BusState>,
    closed: AtomicBool,
}

#[async_trait]
impl MessageSender for MemorySender {
    async fn schedule_message(&self, message: &ScheduledMessage) -> Result<Option<i64>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AzLearnError::Other(format!(
                "Sender for '{}' is closed",
                self.queue
            )));
        }

        let call = self.state.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_every = self.state.fail_every.load(Ordering::SeqCst);
        if fail_every > 0 && call % fail_every == 0 {
            return Err(RequestError::new(ErrorKind::Transient, "Server busy").into());
        }

        // Yield so concurrent senders actually overlap
        tokio::task::yield_now().await;

        let sequence_number = self.state.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .queues
            .lock()
            .await
            .entry(self.queue.clone())
            .or_default()
            .push(EnqueuedMessage {
                sequence_number,
                queue: self.queue.clone(),
                message: message.clone(),
            });
        Ok(Some(sequence_number))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.open_senders.fetch_sub(1, Ordering::SeqCst);
            self.state.senders_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemorySender {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::warn!(queue = %self.queue, "Sender dropped without close");
            self.state.open_senders.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
