use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::Local;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::models::job::PrintJob;
use crate::models::print_job::CompleteJobRequest;
use crate::services::client::{ClientError, QueueClient};
use crate::services::printer::Printer;
use crate::services::storage::LabelStorage;

/// What the agent does with a downloaded label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintMode {
    /// Save to the labels tree and print immediately.
    Print,
    /// Save to the labels tree for manual or batched printing.
    Save,
}

/// Result of handling one job locally.
///
/// Saving and printing are tracked separately: a label that was saved but
/// failed to print is reported as a failed job whose message still names the
/// saved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved { path: String },
    Printed { path: String, printer: String },
    PrintFailed { path: String, detail: String },
    Rejected { reason: String },
}

impl JobOutcome {
    pub fn success(&self) -> bool {
        matches!(self, JobOutcome::Saved { .. } | JobOutcome::Printed { .. })
    }

    pub fn message(&self) -> String {
        match self {
            JobOutcome::Saved { path } => format!("saved to {path}"),
            JobOutcome::Printed { path, printer } => {
                format!("saved to {path}; printed on {printer}")
            }
            JobOutcome::PrintFailed { path, detail } => {
                format!("saved to {path}; print failed: {detail}")
            }
            JobOutcome::Rejected { reason } => reason.clone(),
        }
    }
}

/// Polls the queue server, stores each label locally, optionally prints it
/// and reports the outcome back.
pub struct PollAgent {
    client: QueueClient,
    storage: Arc<LabelStorage>,
    printer: Arc<dyn Printer>,
    mode: PrintMode,
    interval: Duration,
}

impl PollAgent {
    pub fn new(
        client: QueueClient,
        storage: Arc<LabelStorage>,
        printer: Arc<dyn Printer>,
        mode: PrintMode,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            storage,
            printer,
            mode,
            interval,
        }
    }

    /// Poll until `cancel` fires. Request failures are logged and retried on
    /// the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            printer = %self.printer.name(),
            mode = ?self.mode,
            interval_secs = self.interval.as_secs(),
            "Print agent polling for jobs"
        );

        loop {
            match self.poll_once().await {
                Ok(0) => tracing::trace!("No pending print jobs"),
                Ok(n) => tracing::info!(handled = n, "Handled print jobs"),
                Err(ClientError::Unauthorized) => {
                    tracing::error!("Queue server rejected the agent key, check PRINT_AGENT_API_KEY");
                }
                Err(e) => tracing::warn!(error = %e, "Failed to fetch print jobs, will retry"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("Print agent stopped");
    }

    /// Fetch and handle one batch of jobs. Returns how many jobs were handled.
    pub async fn poll_once(&self) -> Result<usize, ClientError> {
        let jobs = self.client.fetch_pending().await?;
        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), "Found pending print jobs");
        }

        for job in &jobs {
            let outcome = self.process_job(job).await;
            self.report(job, &outcome).await;
        }
        Ok(jobs.len())
    }

    /// Decode, save and (in print mode) print one job. Never fails: every
    /// problem becomes a `JobOutcome` to report.
    pub async fn process_job(&self, job: &PrintJob) -> JobOutcome {
        tracing::info!(job_id = %job.id, sku = %job.sku, "Processing print job");

        let Some(encoded) = job.pdf_data.as_deref() else {
            return JobOutcome::Rejected {
                reason: "No PDF data in job".to_string(),
            };
        };

        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(b) => b,
            Err(e) => {
                return JobOutcome::Rejected {
                    reason: format!("Failed to decode PDF: {e}"),
                }
            }
        };

        let saved = match self
            .storage
            .save(&job.id, &job.sku, &job.metadata, &bytes, Local::now())
            .await
        {
            Ok(saved) => saved,
            Err(e) => {
                return JobOutcome::Rejected {
                    reason: format!("Failed to save label: {e}"),
                }
            }
        };

        if self.mode == PrintMode::Save {
            return JobOutcome::Saved { path: saved.path };
        }

        match self.printer.print(&saved.absolute).await {
            Ok(()) => JobOutcome::Printed {
                path: saved.path,
                printer: self.printer.name().to_string(),
            },
            Err(e) => JobOutcome::PrintFailed {
                path: saved.path,
                detail: e.to_string(),
            },
        }
    }

    async fn report(&self, job: &PrintJob, outcome: &JobOutcome) {
        let body = CompleteJobRequest::bounded(
            outcome.success(),
            outcome.message(),
            Some(self.printer.name().to_string()),
        );

        if outcome.success() {
            tracing::info!(job_id = %job.id, sku = %job.sku, message = %body.message, "Job handled");
        } else {
            tracing::warn!(job_id = %job.id, sku = %job.sku, message = %body.message, "Job failed");
        }

        if let Err(e) = self.client.complete(&job.id, &body).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to report job outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use crate::models::label::TireSpec;
    use crate::services::printer::PrintError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePrinter {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Printer for FakePrinter {
        fn name(&self) -> &str {
            "fake"
        }

        async fn print(&self, _path: &Path) -> Result<(), PrintError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PrintError::PrintFailure("printer offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn job(pdf_data: Option<&str>) -> PrintJob {
        PrintJob {
            id: "job_20261018120000_000001_1234".to_string(),
            pdf_data: pdf_data.map(str::to_string),
            pdf_filename: "label_1234.pdf".to_string(),
            sku: "1234".to_string(),
            metadata: TireSpec::default(),
            status: JobStatus::Pending,
            created_at: chrono::Utc::now(),
            completed_at: None,
            printer: None,
            message: None,
            error: None,
        }
    }

    async fn agent(mode: PrintMode, fail: bool) -> (tempfile::TempDir, PollAgent, Arc<FakePrinter>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LabelStorage::new(dir.path()).await.unwrap());
        let printer = Arc::new(FakePrinter {
            fail,
            calls: AtomicUsize::new(0),
        });
        let client = QueueClient::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let agent = PollAgent::new(client, storage, printer.clone(), mode, Duration::from_secs(5));
        (dir, agent, printer)
    }

    const PDF_B64: &str = "JVBERi0xLjQ="; // "%PDF-1.4"

    #[tokio::test]
    async fn test_save_mode_does_not_print() {
        let (_dir, agent, printer) = agent(PrintMode::Save, false).await;
        let outcome = agent.process_job(&job(Some(PDF_B64))).await;

        assert!(matches!(outcome, JobOutcome::Saved { .. }));
        assert!(outcome.success());
        assert_eq!(printer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(agent.storage.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_print_mode_prints_saved_label() {
        let (_dir, agent, printer) = agent(PrintMode::Print, false).await;
        let outcome = agent.process_job(&job(Some(PDF_B64))).await;

        assert!(outcome.success());
        assert!(outcome.message().ends_with("printed on fake"));
        assert_eq!(printer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_print_failure_keeps_saved_file() {
        let (_dir, agent, _printer) = agent(PrintMode::Print, true).await;
        let outcome = agent.process_job(&job(Some(PDF_B64))).await;

        assert!(!outcome.success());
        assert!(outcome.message().contains("print failed"));
        assert!(outcome.message().contains("printer offline"));
        assert_eq!(agent.storage.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_or_bad_payload_is_rejected() {
        let (_dir, agent, _printer) = agent(PrintMode::Save, false).await;

        let outcome = agent.process_job(&job(None)).await;
        assert_eq!(
            outcome,
            JobOutcome::Rejected {
                reason: "No PDF data in job".to_string()
            }
        );

        let outcome = agent.process_job(&job(Some("not base64!"))).await;
        assert!(!outcome.success());
        assert!(outcome.message().starts_with("Failed to decode PDF"));
        assert!(agent.storage.list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let (_dir, agent, _printer) = agent(PrintMode::Save, false).await;
        let err = agent.poll_once().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
