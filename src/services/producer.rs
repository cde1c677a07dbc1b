use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;

use crate::models::label::TireSpec;
use crate::services::queue::JobStore;

/// Queues freshly rendered label files for the remote print agent.
pub struct JobProducer {
    store: Arc<JobStore>,
}

impl JobProducer {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Read a rendered label from disk and queue it as a pending print job.
    pub async fn enqueue_file(
        &self,
        path: &Path,
        sku: &str,
        metadata: TireSpec,
    ) -> Result<String, ProducerError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ProducerError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("label_{sku}.pdf"));

        let pdf_data = base64::engine::general_purpose::STANDARD.encode(&bytes);

        tracing::debug!(
            sku = %sku,
            path = %path.display(),
            size_bytes = bytes.len(),
            "Queueing label for remote printing"
        );

        Ok(self.store.create(pdf_data, filename, sku, metadata).await)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("Failed to read label file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
