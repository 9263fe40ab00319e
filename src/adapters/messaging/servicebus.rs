//! Service Bus queues over the REST API

use super::traits::{MessageBus, MessageSender};
use crate::adapters::credential::{TokenSource, SERVICE_BUS_SCOPE};
use crate::adapters::http::{build_client, check_status, rfc1123, send_error};
use crate::domain::{AzLearnError, Result, ScheduledMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// `BrokerProperties` header payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BrokerProperties<'a> {
    message_id: &'a str,
    scheduled_enqueue_time_utc: String,
}

/// Message bus backed by a Service Bus namespace
pub struct ServiceBusRestBus {
    client: Client,
    namespace_uri: String,
    credential: Arc<dyn TokenSource>,
}

impl ServiceBusRestBus {
    /// Creates a bus for the namespace at `namespace_uri`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        namespace_uri: &str,
        credential: Arc<dyn TokenSource>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            namespace_uri: namespace_uri.trim_end_matches('/').to_string(),
            credential,
        })
    }
}

#[async_trait]
impl MessageBus for ServiceBusRestBus {
    async fn create_sender(&self, queue: &str) -> Result<Box<dyn MessageSender>> {
        if queue.trim().is_empty() {
            return Err(AzLearnError::Validation("Queue name cannot be empty".to_string()));
        }
        Ok(Box::new(RestSender {
            client: self.client.clone(),
            url: format!("{}/{queue}/messages", self.namespace_uri),
            queue: queue.to_string(),
            credential: Arc::clone(&self.credential),
            closed: AtomicBool::new(false),
        }))
    }
}

struct RestSender {
    client: Client,
    url: String,
    queue: String,
    credential: Arc<dyn TokenSource>,
    closed: AtomicBool,
}

#[async_trait]
impl MessageSender for RestSender {
    async fn schedule_message(&self, message: &ScheduledMessage) -> Result<Option<i64>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AzLearnError::Other(format!(
                "Sender for '{}' is closed",
                self.queue
            )));
        }

        let broker = serde_json::to_string(&BrokerProperties {
            message_id: &message.message_id,
            scheduled_enqueue_time_utc: rfc1123(message.scheduled_enqueue_time),
        })?;
        let token = self.credential.token(SERVICE_BUS_SCOPE).await?;

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {token}"))
            .header("BrokerProperties", broker)
            .json(&message.body)
            .send()
            .await
            .map_err(|e| send_error("schedule message", e))?;
        check_status("schedule message", response).await?;

        // The send endpoint does not return a sequence number
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
