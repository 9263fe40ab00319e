//! Cosmos DB document walkthrough
//!
//! Creates a handful of phone status documents, queries them back, then
//! reads, upserts, patches and optionally deletes one of them. Every call is
//! logged with the request charge it was billed, and the charges are summed
//! per operation in a [`DocumentWorkflowSummary`].
//!
//! Read and upsert failures are logged and recorded; the walkthrough moves
//! on. Any other failure aborts the run.

use crate::adapters::clock::{Clock, SystemClock};
use crate::adapters::documents::{query_pages, DocumentContainer, DocumentStore};
use crate::config::{CosmosDbConfig, WorkflowConfig};
use crate::core::cancel::{cancellable, pause};
use crate::domain::patch::describe;
use crate::domain::phone::PHONE_PARTITION_KEY_PATH;
use crate::domain::{
    AzLearnError, ContainerSpec, DocumentId, PartitionKeyValue, PatchOperation, PhoneStatus,
    PhoneStatusInfo, PhoneStatusRow, RequestCharge, Result, TtlSetting,
};
use crate::{log_operation, log_operation_failed, log_step};
use chrono::{DateTime, Local, Utc};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Property the partition query is ordered by
pub const ORDER_BY: &str = "createDate";

/// Lines of business of the documents created with a TTL
pub const TTL_LINES_OF_BIZ: [&str; 2] = ["Biz-X", "Biz-Y"];

/// Lines of business of the session documents
pub const SESSION_LINES_OF_BIZ: [&str; 3] = ["Biz-A", "Biz-B", "Biz-C"];

/// Create date written by the upsert step
pub const UPSERT_CREATE_DATE: &str = "2023-12-28T10:01:53.8085827+08:00";

/// Settings of one document walkthrough run
#[derive(Debug, Clone)]
pub struct DocumentWorkflowSettings {
    /// Container to create and use
    pub container: ContainerSpec,

    /// Phone of the documents created with a TTL
    pub ttl_phone: String,

    /// TTL of those documents, in seconds
    pub ttl_seconds: i64,

    /// Pause between steps
    pub step_delay: Duration,

    /// Remove `/history/1` after the second patch
    pub remove_history_entry: bool,

    /// Delete the queried documents at the end
    pub delete_created: bool,
}

impl DocumentWorkflowSettings {
    /// Builds the settings from the `[cosmosdb]` and `[workflow]` sections
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the container definition is invalid
    /// or not partitioned by `/phone`
    pub fn from_config(cosmos: &CosmosDbConfig, workflow: &WorkflowConfig) -> Result<Self> {
        let default_ttl =
            TtlSetting::from_raw(cosmos.default_ttl).map_err(AzLearnError::Configuration)?;
        let container =
            ContainerSpec::new(&cosmos.container_name, &cosmos.partition_key_path, default_ttl)
                .map_err(AzLearnError::Configuration)?;
        if container.partition_key_path != PHONE_PARTITION_KEY_PATH {
            return Err(AzLearnError::Configuration(format!(
                "Phone status documents are partitioned by {PHONE_PARTITION_KEY_PATH}, \
                 got cosmosdb.partition_key_path = {}",
                container.partition_key_path
            )));
        }

        Ok(Self {
            container,
            ttl_phone: cosmos.ttl_phone.clone(),
            ttl_seconds: cosmos.ttl_seconds,
            step_delay: Duration::from_millis(workflow.step_delay_ms),
            remove_history_entry: workflow.remove_history_entry,
            delete_created: workflow.delete_created,
        })
    }
}

impl Default for DocumentWorkflowSettings {
    fn default() -> Self {
        let cosmos = CosmosDbConfig::default();
        Self {
            container: ContainerSpec {
                id: cosmos.container_name,
                partition_key_path: PHONE_PARTITION_KEY_PATH.to_string(),
                default_ttl: TtlSetting::NoDefault,
            },
            ttl_phone: cosmos.ttl_phone,
            ttl_seconds: cosmos.ttl_seconds,
            step_delay: Duration::ZERO,
            remove_history_entry: false,
            delete_created: false,
        }
    }
}

/// Outcome of a document walkthrough
#[derive(Debug, Clone, Default)]
pub struct DocumentWorkflowSummary {
    /// Phone of the session documents
    pub session_phone: Option<String>,

    /// Documents created
    pub created: usize,

    /// Documents returned by the partition query
    pub queried: usize,

    /// Successful point reads
    pub read: usize,

    /// Successful upserts
    pub upserted: usize,

    /// Successful patches
    pub patched: usize,

    /// Documents deleted
    pub deleted: usize,

    /// Charge per operation name
    pub charges: BTreeMap<String, RequestCharge>,

    /// Sum of every charge
    pub total_charge: RequestCharge,

    /// Failures that did not abort the run
    pub errors: Vec<String>,

    /// The patched document as returned by the last patch
    pub final_document: Option<PhoneStatusInfo>,

    /// Wall-clock duration
    pub duration: Duration,
}

impl DocumentWorkflowSummary {
    /// Adds a charge to its operation and to the total
    pub fn record(&mut self, operation: &str, charge: RequestCharge) {
        *self.charges.entry(operation.to_string()).or_default() += charge;
        self.total_charge += charge;
    }

    /// Summed charge of one operation
    pub fn charge_for(&self, operation: &str) -> RequestCharge {
        self.charges.get(operation).copied().unwrap_or_default()
    }

    /// True if no step failed
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            session_phone = self.session_phone.as_deref().unwrap_or("-"),
            created = self.created,
            queried = self.queried,
            read = self.read,
            upserted = self.upserted,
            patched = self.patched,
            deleted = self.deleted,
            total_charge = %self.total_charge,
            duration_ms = self.duration.as_millis() as u64,
            "Document walkthrough completed"
        );
        for (operation, charge) in &self.charges {
            tracing::info!(operation = %operation, request_charge = %charge, "Charge by operation");
        }
        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Document walkthrough completed with errors"
            );
        }
    }
}

/// Runs the document walkthrough against a [`DocumentStore`]
pub struct DocumentWorkflow {
    store: Arc<dyn DocumentStore>,
    settings: DocumentWorkflowSettings,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl DocumentWorkflow {
    /// Creates a walkthrough using the system clock
    pub fn new(
        store: Arc<dyn DocumentStore>,
        settings: DocumentWorkflowSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            settings,
            clock: Arc::new(SystemClock),
            shutdown,
        }
    }

    /// Uses `clock` for document timestamps and the session phone
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs every step and returns the summary
    ///
    /// # Errors
    ///
    /// Returns the first failure of a step other than read or upsert,
    /// or [`AzLearnError::Cancelled`] on shutdown
    pub async fn run(&self) -> Result<DocumentWorkflowSummary> {
        let started = Instant::now();
        let mut summary = DocumentWorkflowSummary::default();

        if let Err(e) = self.execute(&mut summary).await {
            tracing::error!(
                error = %e,
                created = summary.created,
                total_charge = %summary.total_charge,
                "Document walkthrough aborted"
            );
            return Err(e);
        }

        summary.duration = started.elapsed();
        summary.log_summary();
        Ok(summary)
    }

    async fn execute(&self, summary: &mut DocumentWorkflowSummary) -> Result<()> {
        let spec = &self.settings.container;

        log_step!(1, "Ensure database and container");
        let created = self.call("ensure_database", self.store.ensure_database()).await?;
        tracing::info!(created, "Database ready");
        let container = self
            .call("ensure_container", self.store.ensure_container(spec))
            .await?;
        tracing::info!(
            container = %spec.id,
            partition_key_path = %spec.partition_key_path,
            default_ttl = %spec.default_ttl,
            "Container ready"
        );
        self.pause().await?;

        log_step!(2, format!("Create documents with ttl {}", self.settings.ttl_seconds));
        let ttl_phone =
            PartitionKeyValue::new(&self.settings.ttl_phone).map_err(AzLearnError::Validation)?;
        for line_of_biz in TTL_LINES_OF_BIZ {
            let now = self.clock.now();
            let document = PhoneStatusInfo::builder()
                .phone(ttl_phone.clone())
                .line_of_biz(line_of_biz)
                .comment(format!(
                    "this item got created with TTL {} seconds",
                    self.settings.ttl_seconds
                ))
                .status(PhoneStatus::Black)
                .create_date(now)
                .history_row(PhoneStatusRow::new(PhoneStatus::Black, now))
                .ttl(self.settings.ttl_seconds)
                .build()
                .map_err(AzLearnError::Validation)?;
            self.create(container.as_ref(), &document, summary).await?;
        }
        self.pause().await?;

        log_step!(3, "Create session documents without ttl");
        let session_phone = session_phone(self.clock.now());
        summary.session_phone = Some(session_phone.clone());
        let session_phone =
            PartitionKeyValue::new(session_phone).map_err(AzLearnError::Validation)?;
        for line_of_biz in SESSION_LINES_OF_BIZ {
            let now = self.clock.now();
            let document = PhoneStatusInfo::builder()
                .phone(session_phone.clone())
                .line_of_biz(line_of_biz)
                .status(PhoneStatus::Black)
                .create_date(now)
                .history_row(PhoneStatusRow::new(PhoneStatus::Black, now))
                .build()
                .map_err(AzLearnError::Validation)?;
            self.create(container.as_ref(), &document, summary).await?;
        }
        self.pause().await?;

        log_step!(4, format!("Query phone {session_phone} ordered by {ORDER_BY}"));
        let found = self
            .query(container.as_ref(), &session_phone, summary)
            .await?;
        summary.queried = found.len();
        let Some(pick) = found.last().cloned() else {
            tracing::warn!(phone = %session_phone, "Query returned no documents, stopping");
            return Ok(());
        };
        self.pause().await?;

        log_step!(5, format!("Read and upsert document {}", pick.id));
        self.read(container.as_ref(), &pick.id, &pick.phone, summary)
            .await?;
        self.pause().await?;
        self.upsert(container.as_ref(), &pick, summary).await?;
        self.pause().await?;
        self.read(container.as_ref(), &pick.id, &pick.phone, summary)
            .await?;
        self.pause().await?;

        log_step!(6, "Patch status, comment and history");
        let now = self.clock.now();
        let operations = vec![
            PatchOperation::set("/lineOfBiz", "test")?,
            PatchOperation::set("/status", PhoneStatus::Grey)?,
            PatchOperation::set(
                "/comment",
                format!("Updated: {now}, with new status: {}", PhoneStatus::Grey),
            )?,
            PatchOperation::add("/history/0", PhoneStatusRow::new(PhoneStatus::Grey, now))?,
            PatchOperation::add(
                "/history/0",
                PhoneStatusRow::new(PhoneStatus::Black, now - chrono::Duration::minutes(5)),
            )?,
            // Applied last, so it ends up at the head
            PatchOperation::add(
                "/history/0",
                PhoneStatusRow::new(PhoneStatus::Clear, now - chrono::Duration::minutes(15)),
            )?,
        ];
        self.patch(container.as_ref(), &pick, &operations, summary)
            .await?;
        self.pause().await?;

        log_step!(7, "Patch status back to Clear");
        let now = self.clock.now();
        let operations = vec![
            PatchOperation::set("/status", PhoneStatus::Clear)?,
            PatchOperation::add("/history/0", PhoneStatusRow::new(PhoneStatus::Clear, now))?,
        ];
        self.patch(container.as_ref(), &pick, &operations, summary)
            .await?;
        self.pause().await?;

        if self.settings.remove_history_entry {
            log_step!(8, "Remove history[1]");
            let now = self.clock.now();
            let operations = vec![
                PatchOperation::set(
                    "/comment",
                    format!("Updated: {now}, with history[1] removed"),
                )?,
                PatchOperation::remove("/history/1"),
            ];
            self.patch(container.as_ref(), &pick, &operations, summary)
                .await?;
            self.pause().await?;
        } else {
            tracing::info!(step = 8, "Skipping history removal (--remove-history-entry not set)");
        }

        if self.settings.delete_created {
            log_step!(9, format!("Delete {} session documents", found.len()));
            self.delete_all(container.as_ref(), &found, summary).await?;
        } else {
            tracing::info!(
                step = 9,
                count = found.len(),
                "Keeping session documents (--delete-created not set)"
            );
        }

        Ok(())
    }

    async fn create(
        &self,
        container: &dyn DocumentContainer,
        document: &PhoneStatusInfo,
        summary: &mut DocumentWorkflowSummary,
    ) -> Result<()> {
        let body = serde_json::to_value(document)?;
        let response = self.call("create", container.create(&body)).await?;
        summary.created += 1;
        summary.record("create", response.request_charge);
        log_operation!(
            "create",
            response.request_charge,
            id = %document.id,
            phone = %document.phone,
            ttl = ?document.ttl,
            status_code = response.status_code
        );
        Ok(())
    }

    async fn query(
        &self,
        container: &dyn DocumentContainer,
        phone: &PartitionKeyValue,
        summary: &mut DocumentWorkflowSummary,
    ) -> Result<Vec<PhoneStatusInfo>> {
        let mut found = Vec::new();
        let mut query_charge = RequestCharge::ZERO;
        let mut pages = query_pages(container, phone, ORDER_BY);

        while let Some(page) = self
            .call("query", async { pages.next().await.transpose() })
            .await?
        {
            for item in page.items {
                let document: PhoneStatusInfo = serde_json::from_value(item)?;
                tracing::info!(
                    id = %document.id,
                    phone = %document.phone,
                    line_of_biz = document.line_of_biz.as_deref().unwrap_or("-"),
                    create_date = %document.create_date,
                    request_charge = %page.request_charge,
                    "Query result"
                );
                found.push(document);
            }
            query_charge += page.request_charge;
            summary.record("query", page.request_charge);
        }

        log_operation!("query", query_charge, phone = %phone, count = found.len());
        Ok(found)
    }

    async fn read(
        &self,
        container: &dyn DocumentContainer,
        id: &DocumentId,
        phone: &PartitionKeyValue,
        summary: &mut DocumentWorkflowSummary,
    ) -> Result<()> {
        let result = self.call("read", container.read(id, phone)).await;
        let Some(response) = tolerate(result, summary)? else {
            return Ok(());
        };

        let document: PhoneStatusInfo = serde_json::from_value(response.resource)?;
        summary.read += 1;
        summary.record("read", response.request_charge);
        log_operation!(
            "read",
            response.request_charge,
            id = %document.id,
            phone = %document.phone,
            status = %document.status,
            history_count = document.history.len()
        );
        Ok(())
    }

    async fn upsert(
        &self,
        container: &dyn DocumentContainer,
        pick: &PhoneStatusInfo,
        summary: &mut DocumentWorkflowSummary,
    ) -> Result<()> {
        let create_date = DateTime::parse_from_rfc3339(UPSERT_CREATE_DATE)
            .map_err(|e| AzLearnError::Validation(format!("Invalid upsert create date: {e}")))?
            .with_timezone(&Utc);
        let replacement = PhoneStatusInfo {
            id: pick.id.clone(),
            phone: pick.phone.clone(),
            line_of_biz: None,
            comment: Some(format!("Updated: {}", self.clock.now())),
            status: PhoneStatus::Clear,
            create_date,
            history: Vec::new(),
            ttl: None,
        };
        let body = serde_json::to_value(&replacement)?;

        let result = self.call("upsert", container.upsert(&body)).await;
        let Some(response) = tolerate(result, summary)? else {
            return Ok(());
        };

        let document: PhoneStatusInfo = serde_json::from_value(response.resource)?;
        summary.upserted += 1;
        summary.record("upsert", response.request_charge);
        log_operation!(
            "upsert",
            response.request_charge,
            id = %document.id,
            phone = %document.phone,
            comment = document.comment.as_deref().unwrap_or("-"),
            history_count = document.history.len(),
            status_code = response.status_code
        );
        Ok(())
    }

    async fn patch(
        &self,
        container: &dyn DocumentContainer,
        target: &PhoneStatusInfo,
        operations: &[PatchOperation],
        summary: &mut DocumentWorkflowSummary,
    ) -> Result<()> {
        tracing::info!(id = %target.id, operations = %describe(operations), "Patching");
        let response = self
            .call("patch", container.patch(&target.id, &target.phone, operations))
            .await?;

        let document: PhoneStatusInfo = serde_json::from_value(response.resource)?;
        summary.patched += 1;
        summary.record("patch", response.request_charge);
        log_operation!(
            "patch",
            response.request_charge,
            id = %document.id,
            phone = %document.phone,
            comment = document.comment.as_deref().unwrap_or("-"),
            history_count = document.history.len()
        );
        summary.final_document = Some(document);
        Ok(())
    }

    async fn delete_all(
        &self,
        container: &dyn DocumentContainer,
        documents: &[PhoneStatusInfo],
        summary: &mut DocumentWorkflowSummary,
    ) -> Result<()> {
        let mut total = RequestCharge::ZERO;
        for document in documents {
            let response = self
                .call("delete", container.delete(&document.id, &document.phone))
                .await?;
            summary.deleted += 1;
            summary.record("delete", response.request_charge);
            total += response.request_charge;
            log_operation!(
                "delete",
                response.request_charge,
                id = %document.id,
                phone = %document.phone
            );
        }
        tracing::info!(count = documents.len(), total_charge = %total, "Deleted session documents");
        Ok(())
    }

    /// Awaits a service call, racing the shutdown signal and logging failures
    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        cancellable(&self.shutdown, future)
            .await
            .inspect_err(|e| {
                log_operation_failed!(operation, e);
            })
    }

    async fn pause(&self) -> Result<()> {
        pause(&self.shutdown, self.settings.step_delay).await
    }
}

/// Keeps the run going past a failed read or upsert
fn tolerate<T>(result: Result<T>, summary: &mut DocumentWorkflowSummary) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AzLearnError::Cancelled) => Err(AzLearnError::Cancelled),
        Err(e) => {
            summary.errors.push(e.to_string());
            Ok(None)
        }
    }
}

/// Phone of the session documents: `1` followed by the local `yyddHHmmss`
pub fn session_phone(now: DateTime<Utc>) -> String {
    format!("1{}", now.with_timezone(&Local).format("%y%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::documents::MemoryDocumentStore;

    fn workflow(settings: DocumentWorkflowSettings) -> (DocumentWorkflow, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let store = Arc::new(MemoryDocumentStore::new("CARE").with_page_size(2));
        (DocumentWorkflow::new(store, settings, rx), tx)
    }

    #[test]
    fn test_session_phone_shape() {
        let phone = session_phone(Utc::now());
        assert_eq!(phone.len(), 11);
        assert!(phone.starts_with('1'));
        assert!(phone.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = DocumentWorkflowSettings::default();
        assert_eq!(settings.container.id, "PhoneStatusInfo");
        assert_eq!(settings.container.default_ttl, TtlSetting::NoDefault);
        assert_eq!(settings.ttl_seconds, 120);
        assert!(!settings.delete_created);
    }

    #[test]
    fn test_settings_reject_other_partition_key() {
        let cosmos = CosmosDbConfig {
            partition_key_path: "/id".to_string(),
            ..Default::default()
        };
        let err = DocumentWorkflowSettings::from_config(&cosmos, &WorkflowConfig::default())
            .unwrap_err();
        assert!(matches!(err, AzLearnError::Configuration(_)));
    }

    #[test]
    fn test_summary_record() {
        let mut summary = DocumentWorkflowSummary::default();
        summary.record("create", RequestCharge::new(5.0));
        summary.record("create", RequestCharge::new(5.5));
        summary.record("read", RequestCharge::new(1.0));
        assert_eq!(summary.charge_for("create").value(), 10.5);
        assert_eq!(summary.charge_for("patch").value(), 0.0);
        assert_eq!(summary.total_charge.value(), 11.5);
    }

    #[tokio::test]
    async fn test_full_run() {
        let (workflow, _tx) = workflow(DocumentWorkflowSettings::default());
        let summary = workflow.run().await.unwrap();

        assert_eq!(summary.created, 5);
        assert_eq!(summary.queried, 3);
        assert_eq!(summary.read, 2);
        assert_eq!(summary.upserted, 1);
        assert_eq!(summary.patched, 2);
        assert_eq!(summary.deleted, 0);
        assert!(summary.is_successful());

        let document = summary.final_document.unwrap();
        assert_eq!(document.status, PhoneStatus::Clear);
        assert_eq!(document.line_of_biz.as_deref(), Some("test"));
        // Upsert cleared the history, then 3 + 1 rows were added at the head
        let statuses: Vec<_> = document.history.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                PhoneStatus::Clear,
                PhoneStatus::Clear,
                PhoneStatus::Black,
                PhoneStatus::Grey
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_history_and_delete() {
        let settings = DocumentWorkflowSettings {
            remove_history_entry: true,
            delete_created: true,
            ..Default::default()
        };
        let (workflow, _tx) = workflow(settings);
        let summary = workflow.run().await.unwrap();

        assert_eq!(summary.patched, 3);
        assert_eq!(summary.deleted, 3);
        let history = &summary.final_document.as_ref().unwrap().history;
        assert_eq!(history.len(), 3);
        assert!(summary.charge_for("delete").value() > 0.0);
    }

    #[tokio::test]
    async fn test_history_timestamps_follow_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let start = clock.now();
        let (workflow, _tx) = workflow(DocumentWorkflowSettings::default());
        let summary = workflow.with_clock(clock).run().await.unwrap();

        let history = summary.final_document.unwrap().history;
        assert_eq!(history[0].create_date, start);
        assert_eq!(history[1].create_date, start - chrono::Duration::minutes(15));
        assert_eq!(history[2].create_date, start - chrono::Duration::minutes(5));
        assert_eq!(history[3].create_date, start);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (workflow, tx) = workflow(DocumentWorkflowSettings::default());
        tx.send(true).unwrap();
        let err = workflow.run().await.unwrap_err();
        assert!(matches!(err, AzLearnError::Cancelled));
    }

    #[test]
    fn test_tolerate_keeps_cancellation() {
        let mut summary = DocumentWorkflowSummary::default();
        let failed: Result<()> = Err(AzLearnError::not_found("gone"));
        assert!(tolerate(failed, &mut summary).unwrap().is_none());
        assert_eq!(summary.errors.len(), 1);

        let cancelled: Result<()> = Err(AzLearnError::Cancelled);
        assert!(tolerate(cancelled, &mut summary).is_err());
        assert_eq!(summary.errors.len(), 1);
    }
}
