//! Service Bus scheduling walkthrough
//!
//! Schedules `message_count` messages for delivery `delay_seconds` from now,
//! with at most `max_parallelism` schedule calls in flight. Each call opens
//! its own sender, uses it once and closes it, whether or not scheduling
//! succeeded.

use crate::adapters::clock::{Clock, SystemClock};
use crate::adapters::messaging::MessageBus;
use crate::config::{is_unset, ServiceBusConfig};
use crate::core::cancel::{cancellable, is_cancelled};
use crate::domain::{AzLearnError, DemoPayload, Result, ScheduledMessage};
use crate::log_step;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// `user` field of every payload
pub const DEMO_USER: &str = "Shawn Lin";

/// `age` field of every payload
pub const DEMO_AGE: u32 = 36;

/// Settings of one scheduling run
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSettings {
    pub queue: String,
    pub message_count: usize,
    pub max_parallelism: usize,
    pub delay: chrono::Duration,
}

impl ScheduleSettings {
    /// Builds the settings from the `[servicebus]` section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the queue name is not set or the
    /// parallelism is zero
    pub fn from_config(config: &ServiceBusConfig) -> Result<Self> {
        let queue = config
            .queue_name
            .as_deref()
            .filter(|q| !is_unset(Some(q)))
            .ok_or_else(|| {
                AzLearnError::Configuration("servicebus.queue_name is not set".to_string())
            })?;
        if config.max_parallelism == 0 {
            return Err(AzLearnError::Configuration(
                "servicebus.max_parallelism must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            queue: queue.to_string(),
            message_count: config.message_count,
            max_parallelism: config.max_parallelism,
            delay: chrono::Duration::seconds(config.delay_seconds),
        })
    }
}

/// Outcome of a scheduling run
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSummary {
    pub requested: usize,
    pub scheduled: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub messages_per_second: f64,
}

impl ScheduleSummary {
    fn new(requested: usize, scheduled: usize, failed: usize, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64();
        let messages_per_second = if seconds > 0.0 {
            scheduled as f64 / seconds
        } else {
            0.0
        };
        Self {
            requested,
            scheduled,
            failed,
            elapsed,
            messages_per_second,
        }
    }

    /// True if every requested message was scheduled
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.scheduled == self.requested
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            requested = self.requested,
            scheduled = self.scheduled,
            failed = self.failed,
            elapsed_ms = self.elapsed.as_millis() as u64,
            messages_per_second = format!("{:.1}", self.messages_per_second),
            "Scheduling completed"
        );
    }
}

/// Runs the scheduling walkthrough against a [`MessageBus`]
pub struct ScheduleWorkflow {
    bus: Arc<dyn MessageBus>,
    settings: ScheduleSettings,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl ScheduleWorkflow {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        settings: ScheduleSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            bus,
            settings,
            clock: Arc::new(SystemClock),
            shutdown,
        }
    }

    /// Uses `clock` to compute delivery times
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Schedules every message and returns the summary
    ///
    /// Individual failures are counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`AzLearnError::Cancelled`] if shutdown was requested
    /// during the run
    pub async fn run(&self) -> Result<ScheduleSummary> {
        let settings = &self.settings;
        log_step!(
            1,
            format!(
                "Schedule {} messages on '{}', {} at a time",
                settings.message_count, settings.queue, settings.max_parallelism
            )
        );

        let started = Instant::now();
        let outcomes: Vec<Result<Option<i64>>> = stream::iter(1..=settings.message_count as u64)
            .map(|id| self.schedule_one(id))
            .buffer_unordered(settings.max_parallelism)
            .collect()
            .await;
        let elapsed = started.elapsed();

        let mut scheduled = 0;
        let mut failed = 0;
        for outcome in &outcomes {
            match outcome {
                Ok(_) => scheduled += 1,
                Err(_) => failed += 1,
            }
        }

        let summary = ScheduleSummary::new(settings.message_count, scheduled, failed, elapsed);
        summary.log_summary();

        if is_cancelled(&self.shutdown) {
            tracing::warn!(scheduled, "Scheduling interrupted by shutdown");
            return Err(AzLearnError::Cancelled);
        }
        Ok(summary)
    }

    async fn schedule_one(&self, id: u64) -> Result<Option<i64>> {
        let payload = DemoPayload {
            user: DEMO_USER.to_string(),
            age: DEMO_AGE,
            id,
        };
        let body = serde_json::to_value(&payload)?;

        let mut sender = cancellable(&self.shutdown, self.bus.create_sender(&self.settings.queue))
            .await
            .inspect_err(|e| {
                tracing::error!(id, error = %e, "Failed to create sender");
            })?;

        let message = ScheduledMessage::new(body, self.clock.now() + self.settings.delay);
        let result = cancellable(&self.shutdown, sender.schedule_message(&message)).await;

        if let Err(e) = sender.close().await {
            tracing::warn!(id, error = %e, "Failed to close sender");
        }

        match &result {
            Ok(sequence_number) => tracing::debug!(
                id,
                message_id = %message.message_id,
                sequence_number = ?sequence_number,
                "Message scheduled"
            ),
            Err(e) => tracing::error!(
                id,
                error = %e,
                error_kind = ?e.kind(),
                "Failed to schedule message"
            ),
        }
        result
    }
}
