use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::job::{Completion, JobStatus, PrintJob};

/// Longest completion message the server accepts, in bytes.
pub const MAX_MESSAGE_LEN: usize = 2000;
/// Longest printer name the server accepts, in bytes.
pub const MAX_PRINTER_LEN: usize = 200;

/// Body of `POST /api/print-jobs/{id}/complete`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteJobRequest {
    #[garde(skip)]
    #[serde(default = "default_success")]
    pub success: bool,

    #[garde(length(max = 2000))]
    #[serde(default)]
    pub message: String,

    #[garde(length(min = 1, max = 200))]
    #[serde(default)]
    pub printer: Option<String>,
}

fn default_success() -> bool {
    true
}

impl CompleteJobRequest {
    /// Build a completion that always passes validation: the message and
    /// printer name are cut to the server limits and an empty printer name
    /// is dropped.
    pub fn bounded(success: bool, message: String, printer: Option<String>) -> Self {
        Self {
            success,
            message: truncate_on_char_boundary(message, MAX_MESSAGE_LEN),
            printer: printer
                .filter(|p| !p.is_empty())
                .map(|p| truncate_on_char_boundary(p, MAX_PRINTER_LEN)),
        }
    }
}

fn truncate_on_char_boundary(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

impl From<CompleteJobRequest> for Completion {
    fn from(req: CompleteJobRequest) -> Self {
        Completion {
            success: req.success,
            message: req.message,
            printer: req.printer,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteJobResponse {
    pub success: bool,
    pub job_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<PrintJob>,
    pub count: usize,
}

impl From<Vec<PrintJob>> for JobListResponse {
    fn from(jobs: Vec<PrintJob>) -> Self {
        Self {
            count: jobs.len(),
            jobs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueStatusResponse {
    pub pending_count: usize,
    pub remote_printing_enabled: bool,
}

/// Query string for the pending listing.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_include_payload")]
    pub include_payload: bool,
}

fn default_include_payload() -> bool {
    true
}

/// Query string for the history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Response after uploading a rendered label.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadLabelResponse {
    pub success: bool,
    pub sku: String,
    pub label_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub remote_printing_enabled: bool,
    /// Set when the label was stored but could not be queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
