use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::job::{Completion, JobStatus, PrintJob};
use crate::models::label::{sanitize_component, TireSpec};

struct StoredJob {
    /// Creation order; breaks ties between jobs created in the same instant.
    seq: u64,
    job: PrintJob,
}

/// In-memory print job table.
///
/// Owns every job record. Callers only ever receive copies; `create`,
/// `complete` and `purge` take the write lock so they serialise against each
/// other and against listings.
pub struct JobStore {
    jobs: RwLock<HashMap<String, StoredJob>>,
    next_seq: AtomicU64,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Store a new pending job and return its ID.
    ///
    /// `pdf_data` is the base64-encoded label document.
    pub async fn create(
        &self,
        pdf_data: String,
        pdf_filename: impl Into<String>,
        sku: impl Into<String>,
        metadata: TireSpec,
    ) -> String {
        let sku = sku.into();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let id = format!(
            "job_{}_{:06}_{}",
            now.format("%Y%m%d%H%M%S"),
            seq,
            sanitize_component(&sku)
        );

        let job = PrintJob {
            id: id.clone(),
            pdf_data: Some(pdf_data),
            pdf_filename: pdf_filename.into(),
            sku,
            metadata,
            status: JobStatus::Pending,
            created_at: now,
            completed_at: None,
            printer: None,
            message: None,
            error: None,
        };

        let pending = {
            let mut jobs = self.jobs.write().await;
            jobs.insert(id.clone(), StoredJob { seq, job });
            count_pending(&jobs)
        };

        metrics::counter!("print_jobs_created_total").increment(1);
        metrics::gauge!("print_jobs_pending").set(pending as f64);
        tracing::info!(job_id = %id, "Created print job");

        id
    }

    /// All pending jobs in creation order.
    pub async fn list_pending(&self, include_payload: bool) -> Vec<PrintJob> {
        let jobs = self.jobs.read().await;
        let mut pending: Vec<&StoredJob> = jobs
            .values()
            .filter(|s| s.job.status == JobStatus::Pending)
            .collect();
        pending.sort_by_key(|s| s.seq);
        pending
            .into_iter()
            .map(|s| s.job.view(include_payload))
            .collect()
    }

    pub async fn get(&self, job_id: &str, include_payload: bool) -> Result<PrintJob, QueueError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(|s| s.job.view(include_payload))
            .ok_or_else(|| QueueError::NotFound(job_id.to_string()))
    }

    /// Move a pending job to its terminal state and drop its payload.
    ///
    /// A job that already left `pending` is left untouched.
    pub async fn complete(
        &self,
        job_id: &str,
        completion: Completion,
    ) -> Result<JobStatus, QueueError> {
        let (status, pending) = {
            let mut jobs = self.jobs.write().await;
            let stored = jobs
                .get_mut(job_id)
                .ok_or_else(|| QueueError::NotFound(job_id.to_string()))?;
            let job = &mut stored.job;

            if job.status.is_terminal() {
                return Err(QueueError::AlreadyCompleted {
                    job_id: job_id.to_string(),
                    status: job.status,
                });
            }

            job.status = if completion.success {
                JobStatus::Complete
            } else {
                JobStatus::Failed
            };
            job.completed_at = Some(Utc::now());
            job.printer = completion.printer;
            job.pdf_data = None;
            if !completion.success {
                job.error = Some(completion.message.clone());
            }
            job.message = Some(completion.message);
            let status = job.status;

            (status, count_pending(&jobs))
        };

        metrics::gauge!("print_jobs_pending").set(pending as f64);
        match status {
            JobStatus::Failed => {
                metrics::counter!("print_jobs_failed_total").increment(1);
                tracing::warn!(job_id = %job_id, "Print job failed");
            }
            _ => {
                metrics::counter!("print_jobs_completed_total").increment(1);
                tracing::info!(job_id = %job_id, "Print job complete");
            }
        }

        Ok(status)
    }

    /// Job history without payloads, newest first.
    pub async fn list_all(&self, limit: usize) -> Vec<PrintJob> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<&StoredJob> = jobs.values().collect();
        all.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        all.into_iter()
            .take(limit)
            .map(|s| s.job.without_payload())
            .collect()
    }

    pub async fn pending_count(&self) -> usize {
        count_pending(&*self.jobs.read().await)
    }

    /// Remove terminal jobs that completed at least `max_age` ago.
    /// Pending jobs are never purged. Returns how many jobs were removed.
    pub async fn purge(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let removed = {
            let mut jobs = self.jobs.write().await;
            let before = jobs.len();
            jobs.retain(|_, s| match s.job.completed_at {
                Some(done) if s.job.status.is_terminal() => done > cutoff,
                _ => true,
            });
            before - jobs.len()
        };

        if removed > 0 {
            metrics::counter!("print_jobs_purged_total").increment(removed as u64);
            tracing::info!(removed, "Purged old print jobs");
        }
        removed
    }
}

fn count_pending(jobs: &HashMap<String, StoredJob>) -> usize {
    jobs.values()
        .filter(|s| s.job.status == JobStatus::Pending)
        .count()
}

/// Periodically purge aged-out terminal jobs until `cancel` fires.
pub fn spawn_purge_task(
    store: Arc<JobStore>,
    every: Duration,
    max_age: chrono::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Purge task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    store.purge(max_age).await;
                }
            }
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Print job not found: {0}")]
    NotFound(String),

    #[error("Print job {job_id} is already {status}")]
    AlreadyCompleted { job_id: String, status: JobStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn completion(success: bool, message: &str) -> Completion {
        Completion {
            success,
            message: message.to_string(),
            printer: Some("Brother_DCP_L2530DW_series".to_string()),
        }
    }

    async fn create(store: &JobStore, sku: &str) -> String {
        store
            .create("JVBERi0xLjQ=".to_string(), format!("label_{sku}.pdf"), sku, TireSpec::default())
            .await
    }

    #[tokio::test]
    async fn test_payload_present_only_while_pending() {
        let store = JobStore::new();
        let id = create(&store, "1234").await;

        let job = store.get(&id, true).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.pdf_data.is_some());
        assert!(job.completed_at.is_none());

        let status = store.complete(&id, completion(true, "saved")).await.unwrap();
        assert_eq!(status, JobStatus::Complete);

        let job = store.get(&id, true).await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.pdf_data.is_none());
        assert!(job.completed_at.is_some());
        assert!(job.error.is_none());
        assert_eq!(job.printer.as_deref(), Some("Brother_DCP_L2530DW_series"));
    }

    #[tokio::test]
    async fn test_failure_records_error() {
        let store = JobStore::new();
        let id = create(&store, "1234").await;

        let status = store
            .complete(&id, completion(false, "printer offline"))
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Failed);

        let job = store.get(&id, true).await.unwrap();
        assert_eq!(job.error.as_deref(), Some("printer offline"));
        assert!(job.pdf_data.is_none());
    }

    #[tokio::test]
    async fn test_second_completion_is_rejected() {
        let store = JobStore::new();
        let id = create(&store, "1234").await;

        store.complete(&id, completion(false, "jam")).await.unwrap();
        let err = store.complete(&id, completion(true, "retry")).await.unwrap_err();
        assert!(matches!(
            err,
            QueueError::AlreadyCompleted { status: JobStatus::Failed, .. }
        ));

        let job = store.get(&id, true).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("jam"));
        assert!(job.pdf_data.is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = JobStore::new();
        let err = store
            .complete("nonexistent", completion(true, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::NotFound(ref id) if id == "nonexistent"));
        assert!(store.get("nonexistent", false).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_listing_excludes_terminal_jobs() {
        let store = JobStore::new();
        let a = create(&store, "A").await;
        let b = create(&store, "B").await;

        store.complete(&a, completion(true, "")).await.unwrap();

        let pending = store.list_pending(true).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b);
        assert_eq!(store.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_pending_listing_strips_payload_on_request() {
        let store = JobStore::new();
        create(&store, "A").await;

        assert!(store.list_pending(false).await[0].pdf_data.is_none());
        assert!(store.list_pending(true).await[0].pdf_data.is_some());
    }

    #[tokio::test]
    async fn test_list_all_newest_first_and_truncated() {
        let store = JobStore::new();
        let _first = create(&store, "t1").await;
        let second = create(&store, "t2").await;
        let third = create(&store, "t3").await;

        let all = store.list_all(2).await;
        let ids: Vec<&str> = all.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec![third.as_str(), second.as_str()]);
        assert!(all.iter().all(|j| j.pdf_data.is_none()));
    }

    #[tokio::test]
    async fn test_same_sku_ids_do_not_collide() {
        let store = JobStore::new();
        let mut ids = HashSet::new();
        for _ in 0..50 {
            ids.insert(create(&store, "1234").await);
        }
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|id| id.starts_with("job_") && id.ends_with("_1234")));
    }

    #[tokio::test]
    async fn test_job_id_sanitises_sku() {
        let store = JobStore::new();
        let id = create(&store, "225/45 R17").await;
        assert!(id.ends_with("_225_45_R17"));

        let job = store.get(&id, false).await.unwrap();
        assert_eq!(job.sku, "225/45 R17");
    }

    #[tokio::test]
    async fn test_purge_keeps_pending_jobs() {
        let store = JobStore::new();
        let done = create(&store, "done").await;
        let waiting = create(&store, "waiting").await;
        store.complete(&done, completion(true, "")).await.unwrap();

        assert_eq!(store.purge(chrono::Duration::hours(24)).await, 0);
        assert_eq!(store.purge(chrono::Duration::zero()).await, 1);

        assert!(store.get(&done, false).await.is_err());
        assert!(store.get(&waiting, false).await.is_ok());
        assert_eq!(store.list_all(50).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_and_completions() {
        let store = Arc::new(JobStore::new());
        let handles = (0..20).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let id = create(&store, &format!("sku{i}")).await;
                if i % 2 == 0 {
                    store.complete(&id, completion(true, "")).await.unwrap();
                }
            })
        });
        for result in futures::future::join_all(handles).await {
            result.unwrap();
        }

        assert_eq!(store.pending_count().await, 10);
        assert_eq!(store.list_all(100).await.len(), 20);
    }

    #[tokio::test]
    async fn test_purge_task_stops_on_cancel() {
        let store = Arc::new(JobStore::new());
        let cancel = CancellationToken::new();
        let handle = spawn_purge_task(
            store,
            Duration::from_millis(10),
            chrono::Duration::zero(),
            cancel.clone(),
        );
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
