//! Schedule command implementation
//!
//! Runs the Service Bus scheduling walkthrough against the configured bus.

use super::{failure_exit_code, load_or_report, report_not_configured};
use crate::adapters::factory::create_message_bus;
use crate::config::ConfigLoader;
use crate::core::schedule::{ScheduleSettings, ScheduleWorkflow};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the schedule command
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Override the number of messages (servicebus.message_count)
    #[arg(long)]
    pub count: Option<usize>,

    /// Override the schedule calls in flight (servicebus.max_parallelism)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Override the delivery delay (servicebus.delay_seconds)
    #[arg(long)]
    pub delay_seconds: Option<i64>,
}

impl ScheduleArgs {
    /// Execute the schedule command
    pub async fn execute(
        &self,
        loader: &ConfigLoader,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting schedule command");

        let mut loader = loader.clone();
        if let Some(count) = self.count {
            tracing::info!(count, "Overriding message count from CLI");
            loader = loader.with_override("servicebus.message_count", count.to_string());
        }
        if let Some(parallelism) = self.parallelism {
            tracing::info!(parallelism, "Overriding parallelism from CLI");
            loader = loader.with_override("servicebus.max_parallelism", parallelism.to_string());
        }
        if let Some(delay) = self.delay_seconds {
            tracing::info!(delay, "Overriding delivery delay from CLI");
            loader = loader.with_override("servicebus.delay_seconds", delay.to_string());
        }

        let Some(layered) = load_or_report(&loader) else {
            return Ok(2); // Configuration error exit code
        };
        let config = layered.config();
        let servicebus = config.servicebus.clone().unwrap_or_default();

        let bus = match create_message_bus(config, &servicebus) {
            Ok(Some(bus)) => bus,
            Ok(None) => {
                return Ok(report_not_configured(
                    "Service Bus",
                    "servicebus.namespace_uri and servicebus.queue_name",
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Service Bus client");
                eprintln!("Failed to create Service Bus client: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let settings = match ScheduleSettings::from_config(&servicebus) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if let Some(ref uri) = servicebus.namespace_uri {
            println!("ServiceBus Uri: {uri}");
        }
        println!("ServiceBus Queue Name: {}", settings.queue);
        println!();

        let summary = match ScheduleWorkflow::new(bus, settings, shutdown_signal)
            .run()
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Scheduling failed: {e}");
                return Ok(failure_exit_code(&e));
            }
        };

        println!("Scheduled {} of {} messages", summary.scheduled, summary.requested);
        println!(
            "took {}ms ({:.1} messages/s).",
            summary.elapsed.as_millis(),
            summary.messages_per_second
        );

        if summary.is_successful() {
            Ok(0)
        } else {
            println!("⚠️  {} messages failed to schedule", summary.failed);
            Ok(1) // Partial success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_queue_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(&path, "[servicebus]\nbackend = \"memory\"\n").unwrap();

        let (_tx, rx) = watch::channel(false);
        let args = ScheduleArgs {
            count: None,
            parallelism: None,
            delay_seconds: None,
        };
        let code = args.execute(&ConfigLoader::new(&path), rx).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_memory_backend_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azlearn.toml");
        std::fs::write(
            &path,
            "[servicebus]\nbackend = \"memory\"\nqueue_name = \"demo\"\n",
        )
        .unwrap();

        let (_tx, rx) = watch::channel(false);
        let args = ScheduleArgs {
            count: Some(25),
            parallelism: Some(5),
            delay_seconds: Some(1),
        };
        let code = args.execute(&ConfigLoader::new(&path), rx).await.unwrap();
        assert_eq!(code, 0);
    }
}
