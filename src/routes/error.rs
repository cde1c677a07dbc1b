use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::printer::PrintError;
use crate::services::producer::ProducerError;
use crate::services::queue::QueueError;
use crate::services::storage::StorageError;

/// Error returned by every handler, rendered as a JSON body whose `error`
/// field lets callers tell "unauthorized" apart from "not found".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    PrintFailure(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PrintFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unauthorized => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Io(_) => "io_error",
            ApiError::PrintFailure(_) => "print_failure",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound(_) => ApiError::NotFound(err.to_string()),
            QueueError::AlreadyCompleted { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ProducerError> for ApiError {
    fn from(err: ProducerError) -> Self {
        ApiError::Io(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StorageError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            StorageError::InvalidPath(_) => ApiError::BadRequest(err.to_string()),
            StorageError::Io(_) => ApiError::Io(err.to_string()),
        }
    }
}

impl From<PrintError> for ApiError {
    fn from(err: PrintError) -> Self {
        ApiError::PrintFailure(err.to_string())
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::BadRequest(report.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
