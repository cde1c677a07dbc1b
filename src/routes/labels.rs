use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Local;
use garde::Validate;
use tokio::io::AsyncWriteExt;

use crate::app_state::AppState;
use crate::models::label::{sanitize_component, TireSpec};
use crate::models::print_job::UploadLabelResponse;
use crate::routes::error::ApiError;
use crate::routes::print_jobs::authorize;

const PDF_MAGIC: &[u8] = b"%PDF";
const MAX_SKU_LEN: usize = 100;

/// POST /api/labels: store a rendered label and queue it for the print agent.
///
/// Multipart fields: `label` (PDF file), `sku`, and optional tire attributes.
/// Failing to queue the label does not fail the upload; the error is
/// reported in the response body instead.
pub async fn upload_label(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadLabelResponse>, ApiError> {
    authorize(&headers, state.config.api_key())?;
    let mut multipart = multipart?;

    let mut label: Option<Vec<u8>> = None;
    let mut sku: Option<String> = None;
    let mut spec = TireSpec::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "label" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                if !data.starts_with(PDF_MAGIC) {
                    return Err(ApiError::BadRequest("label must be a PDF document".to_string()));
                }
                label = Some(data.to_vec());
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                if name == "sku" {
                    sku = Some(value.trim().to_string()).filter(|s| !s.is_empty());
                } else if !spec.set_field(&name, value) {
                    tracing::debug!(field = %name, "Ignoring unknown label field");
                }
            }
        }
    }

    let label = label.ok_or_else(|| ApiError::BadRequest("missing label file".to_string()))?;
    let sku = sku.ok_or_else(|| ApiError::BadRequest("missing sku".to_string()))?;
    if sku.len() > MAX_SKU_LEN {
        return Err(ApiError::BadRequest(format!("sku longer than {MAX_SKU_LEN} characters")));
    }
    spec.validate()?;

    let labels_dir = &state.config.labels_dir;
    tokio::fs::create_dir_all(labels_dir)
        .await
        .map_err(|e| ApiError::Io(format!("Failed to create labels directory: {e}")))?;
    let label_path = write_unique(labels_dir, &sku, &label)
        .await
        .map_err(|e| ApiError::Io(format!("Failed to write label: {e}")))?;

    tracing::info!(sku = %sku, path = %label_path.display(), "Label stored");

    let mut response = UploadLabelResponse {
        success: true,
        sku: sku.clone(),
        label_path: label_path.display().to_string(),
        job_id: None,
        remote_printing_enabled: state.remote_printing(),
        error: None,
    };

    if state.remote_printing() {
        match state.producer.enqueue_file(&label_path, &sku, spec).await {
            Ok(job_id) => response.job_id = Some(job_id),
            Err(e) => {
                tracing::error!(sku = %sku, error = %e, "Failed to queue label for printing");
                response.error = Some(e.to_string());
            }
        }
    }

    Ok(Json(response))
}

/// Write an uploaded label under a name no other upload can claim, so the
/// producer always reads back the bytes of this request.
async fn write_unique(dir: &Path, sku: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    let base = format!(
        "label_{}_{}",
        sanitize_component(sku),
        Local::now().format("%Y%m%d%H%M%S")
    );
    let mut n = 0;
    loop {
        let path = match n {
            0 => dir.join(format!("{base}.pdf")),
            _ => dir.join(format!("{base}_{n}.pdf")),
        };
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(data).await?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}
