//! Error taxonomy for the record store and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use glossary_types::{ApiResponse, FieldError};
use std::fmt;
use std::path::PathBuf;

/// Failures of the backing document. Absence of a record is not an error.
#[derive(Debug)]
pub enum StoreError {
    /// The document exists but cannot be read or parsed. Fatal at startup.
    Unavailable { path: PathBuf, reason: String },
    /// Persisting a mutation failed; memory was left unchanged.
    WriteFailed { path: PathBuf, reason: String },
    /// The next id would overflow `i64`.
    IdsExhausted { path: PathBuf },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable { path, reason } => {
                write!(f, "glossary storage {} unavailable: {}", path.display(), reason)
            }
            StoreError::WriteFailed { path, reason } => {
                write!(f, "failed to write glossary storage {}: {}", path.display(), reason)
            }
            StoreError::IdsExhausted { path } => {
                write!(f, "glossary storage {} has no term ids left", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Every non-success outcome of a request handler.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<FieldError>),
    /// Input that could not be decoded at all (bad JSON, non-integer id).
    BadRequest(String),
    NotFound(i64),
    Storage(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Storage(e)
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        ApiError::Validation(errors)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => {
                log::debug!("Rejected request: {} invalid field(s)", errors.len());
                ApiResponse {
                    success: false,
                    message: "Validation failed".to_string(),
                    data: Some(errors),
                }
            }
            ApiError::BadRequest(msg) => ApiResponse::err(msg),
            ApiError::NotFound(id) => {
                log::debug!("Term #{} not found", id);
                ApiResponse::err(format!("Term with ID {} not found", id))
            }
            ApiError::Storage(e) => {
                log::error!("{}", e);
                ApiResponse::err(format!("Storage error: {}", e))
            }
        };
        (status, Json(body)).into_response()
    }
}
