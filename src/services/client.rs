use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::models::job::PrintJob;
use crate::models::print_job::{CompleteJobRequest, CompleteJobResponse, JobListResponse};

/// Header carrying the shared agent key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client the print agent uses to talk to the queue server.
pub struct QueueClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    completion_timeout: Duration,
}

impl QueueClient {
    /// `timeout` bounds the listing call; completion calls use the shorter of
    /// `timeout` and ten seconds.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("print-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            completion_timeout: timeout.min(Duration::from_secs(10)),
        })
    }

    fn with_key(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key),
            None => req,
        }
    }

    /// Fetch pending jobs including their payloads.
    pub async fn fetch_pending(&self) -> Result<Vec<PrintJob>, ClientError> {
        let url = format!("{}/api/print-jobs", self.base_url);
        let response = self.with_key(self.http.get(&url)).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<JobListResponse>().await?.jobs),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            status => Err(ClientError::UnexpectedStatus(status)),
        }
    }

    /// Report the outcome of a job.
    pub async fn complete(
        &self,
        job_id: &str,
        body: &CompleteJobRequest,
    ) -> Result<CompleteJobResponse, ClientError> {
        let url = format!("{}/api/print-jobs/{}/complete", self.base_url, job_id);
        let response = self
            .with_key(self.http.post(&url))
            .timeout(self.completion_timeout)
            .json(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(job_id.to_string())),
            status => Err(ClientError::UnexpectedStatus(status)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Unauthorized: check PRINT_AGENT_API_KEY")]
    Unauthorized,

    #[error("Print job not found on server: {0}")]
    NotFound(String),

    #[error("Server returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Request to queue server failed: {0}")]
    Transport(#[from] reqwest::Error),
}
