//! Error types for scorearena-web
//!
//! Domain errors ([`ArenaError`], [`UploadError`]) stay free of HTTP concerns;
//! [`ApiError`] maps them onto status codes and a JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::catalog::PieceId;

/// Arena and catalog errors
///
/// None of these are retried; every one is reported to the caller.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Piece has no tracks in the catalog
    #[error("Unknown piece: {0}")]
    NotFound(PieceId),

    /// No piece has two or more distinct model labels
    #[error("No piece has renditions from two different models yet")]
    NoEligiblePiece,

    /// Requested piece has fewer than two distinct model labels
    #[error("Piece {0} needs renditions from at least two different models")]
    InsufficientVariants(PieceId),

    /// Vote references a label that is not part of the pairing
    #[error("Invalid choice {0:?}: expected \"A\" or \"B\"")]
    InvalidChoice(String),

    /// Submitted pairing does not match the catalog or is malformed
    #[error("Invalid pairing: {0}")]
    InvalidPairing(String),

    /// Reading the artifact store or metadata log failed
    #[error("Catalog read failed: {0}")]
    CatalogRead(#[source] scorearena_common::Error),

    /// Appending the verdict record failed
    #[error("Failed to store verdict: {0}")]
    StorageWrite(#[source] scorearena_common::Error),
}

/// Upload and conversion errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Request carried no file part, or an empty one
    #[error("No score selected")]
    MissingFile,

    /// File extension is not accepted
    #[error("File type not allowed: {0}")]
    UnsupportedFileType(String),

    /// Nothing usable remains of the file name after sanitizing
    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),

    /// External converter failed to run or exited non-zero
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    /// Saving the uploaded file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Recording the track metadata failed
    #[error("Metadata error: {0}")]
    Metadata(#[from] scorearena_common::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Arena error, status depends on the variant
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// Upload error, status depends on the variant
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// scorearena-common error
    #[error("Common error: {0}")]
    Common(#[from] scorearena_common::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Arena(err) => match err {
                ArenaError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ArenaError::NoEligiblePiece => (StatusCode::NOT_FOUND, "NO_ELIGIBLE_PIECE"),
                ArenaError::InsufficientVariants(_) => {
                    (StatusCode::CONFLICT, "INSUFFICIENT_VARIANTS")
                }
                ArenaError::InvalidChoice(_) => (StatusCode::BAD_REQUEST, "INVALID_CHOICE"),
                ArenaError::InvalidPairing(_) => (StatusCode::BAD_REQUEST, "INVALID_PAIRING"),
                ArenaError::CatalogRead(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CATALOG_READ_ERROR")
                }
                ArenaError::StorageWrite(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_WRITE_ERROR")
                }
            },
            ApiError::Upload(err) => match err {
                UploadError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
                UploadError::UnsupportedFileType(_) => {
                    (StatusCode::BAD_REQUEST, "UNSUPPORTED_FILE_TYPE")
                }
                UploadError::InvalidFilename(_) => (StatusCode::BAD_REQUEST, "INVALID_FILENAME"),
                UploadError::ConversionFailed(_) => (StatusCode::BAD_GATEWAY, "CONVERSION_FAILED"),
                UploadError::Io(_) | UploadError::Metadata(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_WRITE_ERROR")
                }
            },
            ApiError::Common(err) => match err {
                scorearena_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, "Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
