//! Integration tests for the scheduling walkthrough against the in-memory bus

use azlearn::adapters::clock::{Clock, ManualClock};
use azlearn::adapters::messaging::MemoryMessageBus;
use azlearn::config::ServiceBusConfig;
use azlearn::core::schedule::{ScheduleSettings, ScheduleWorkflow, DEMO_USER};
use azlearn::domain::DemoPayload;
use chrono::{Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use test_case::test_case;
use tokio::sync::watch;

fn settings(count: usize, parallelism: usize, delay_seconds: i64) -> ScheduleSettings {
    let config = ServiceBusConfig {
        queue_name: Some("learn-queue".to_string()),
        message_count: count,
        max_parallelism: parallelism,
        delay_seconds,
        ..Default::default()
    };
    ScheduleSettings::from_config(&config).unwrap()
}

#[test_case(1, 1 ; "sequential")]
#[test_case(100, 8 ; "eight in flight")]
#[test_case(250, 32 ; "default parallelism")]
#[tokio::test]
async fn test_every_message_scheduled_within_bound(count: usize, parallelism: usize) {
    let bus = MemoryMessageBus::new();
    let (_tx, rx) = watch::channel(false);
    let settings = settings(count, parallelism, 10);
    let workflow = ScheduleWorkflow::new(Arc::new(bus.clone()), settings, rx);

    let summary = workflow.run().await.unwrap();
    assert_eq!(summary.requested, count);
    assert_eq!(summary.scheduled, count);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_successful());

    assert_eq!(bus.scheduled_count("learn-queue").await, count);
    assert!(bus.peak_open_senders() <= parallelism);
    assert_eq!(bus.senders_created(), count);
    assert_eq!(bus.senders_closed(), count);
    assert_eq!(bus.open_senders(), 0);
}

#[tokio::test]
async fn test_nothing_due_before_delay() {
    let start = Utc::now();
    let clock = Arc::new(ManualClock::new(start));
    let bus = MemoryMessageBus::new();
    let (_tx, rx) = watch::channel(false);
    let workflow = ScheduleWorkflow::new(Arc::new(bus.clone()), settings(20, 4, 10), rx)
        .with_clock(clock.clone());
    workflow.run().await.unwrap();

    let now = clock.now();
    assert!(bus.due_messages("learn-queue", now).await.is_empty());
    assert!(bus
        .due_messages("learn-queue", now + Duration::seconds(9))
        .await
        .is_empty());

    let due = bus
        .due_messages("learn-queue", now + Duration::seconds(10))
        .await;
    assert_eq!(due.len(), 20);

    let ids: BTreeSet<u64> = due
        .iter()
        .map(|m| serde_json::from_value::<DemoPayload>(m.message.body.clone()).unwrap())
        .inspect(|payload| assert_eq!(payload.user, DEMO_USER))
        .map(|payload| payload.id)
        .collect();
    assert_eq!(ids, (1..=20).collect());
}

#[tokio::test]
async fn test_failed_calls_still_close_senders() {
    let bus = MemoryMessageBus::new().fail_every(10);
    let (_tx, rx) = watch::channel(false);
    let workflow = ScheduleWorkflow::new(Arc::new(bus.clone()), settings(100, 16, 10), rx);

    let summary = workflow.run().await.unwrap();
    assert_eq!(summary.failed, 10);
    assert_eq!(summary.scheduled, 90);
    assert!(!summary.is_successful());
    assert_eq!(bus.senders_closed(), 100);
    assert_eq!(bus.open_senders(), 0);
}
