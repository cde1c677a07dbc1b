use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::label::TireSpec;

/// Status of a print job in the remote queue.
///
/// `Pending` is the only non-terminal state. `Complete` and `Failed` differ
/// only in `error` being set on the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// A label print job.
///
/// `pdf_data` holds the base64-encoded label document and is present only
/// while the job is pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_data: Option<String>,
    pub pdf_filename: String,
    pub sku: String,
    #[serde(default)]
    pub metadata: TireSpec,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub printer: Option<String>,
    /// Outcome detail reported by the agent ("saved to ...", "printed on ...").
    pub message: Option<String>,
    pub error: Option<String>,
}

impl PrintJob {
    /// Copy of the job with the payload stripped, for listings.
    pub fn without_payload(&self) -> Self {
        Self {
            id: self.id.clone(),
            pdf_data: None,
            pdf_filename: self.pdf_filename.clone(),
            sku: self.sku.clone(),
            metadata: self.metadata.clone(),
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
            printer: self.printer.clone(),
            message: self.message.clone(),
            error: self.error.clone(),
        }
    }

    /// Copy of the job, keeping the payload only when asked to.
    pub fn view(&self, include_payload: bool) -> Self {
        if include_payload {
            self.clone()
        } else {
            self.without_payload()
        }
    }
}

/// Outcome an agent reports for a job.
#[derive(Debug, Clone)]
pub struct Completion {
    pub success: bool,
    pub message: String,
    pub printer: Option<String>,
}
