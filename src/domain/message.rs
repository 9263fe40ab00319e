//! Scheduled queue message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message to be enqueued no earlier than `scheduled_enqueue_time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    /// Unique message id, also used for duplicate detection
    pub message_id: String,

    /// JSON body
    pub body: serde_json::Value,

    /// Earliest delivery time
    pub scheduled_enqueue_time: DateTime<Utc>,
}

impl ScheduledMessage {
    /// Creates a message with a fresh id
    pub fn new(body: serde_json::Value, scheduled_enqueue_time: DateTime<Utc>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            body,
            scheduled_enqueue_time,
        }
    }

    /// True once the message may be delivered
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.scheduled_enqueue_time
    }
}

/// Body sent by the scheduling walkthrough
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoPayload {
    pub user: String,
    pub age: u32,
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let msg = ScheduledMessage::new(json!({"id": 1}), now + Duration::seconds(10));
        assert!(!msg.is_due(now));
        assert!(msg.is_due(now + Duration::seconds(10)));
    }

    #[test]
    fn test_demo_payload_shape() {
        let body = serde_json::to_value(DemoPayload {
            user: "Shawn Lin".to_string(),
            age: 36,
            id: 7,
        })
        .unwrap();
        assert_eq!(body, json!({"user": "Shawn Lin", "age": 36, "id": 7}));
    }
}
