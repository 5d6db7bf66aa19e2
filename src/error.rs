//! Error types for the OCR PDF server

use std::path::PathBuf;

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::OcrError;
use crate::rasterizer::RasterizeError;

/// Request-level result type
pub type Result<T> = std::result::Result<T, OcrPdfError>;

/// Every way an `/ocr-pdf` request can fail.
///
/// Each variant maps to exactly one status code and message; callers and
/// tests match on the variant rather than on the rendered text.
#[derive(Error, Debug)]
pub enum OcrPdfError {
    #[error("Only PDF files are supported")]
    InvalidFileType,

    #[error("No file provided")]
    MissingFile,

    #[error("Invalid multipart request: {0}")]
    InvalidMultipart(#[from] MultipartRejection),

    #[error("Failed to read upload: {0}")]
    UploadRead(#[from] MultipartError),

    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Failed to convert PDF to images: {0}")]
    Rasterization(#[from] RasterizeError),

    #[error("Failed to list page images: {0}")]
    PageListing(#[source] std::io::Error),

    #[error("OCR failed on {}: {source}", path.display())]
    Ocr {
        path: PathBuf,
        #[source]
        source: OcrError,
    },
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl OcrPdfError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFileType | Self::MissingFile => StatusCode::BAD_REQUEST,
            Self::InvalidMultipart(e) => e.status(),
            Self::UploadRead(e) => e.status(),
            Self::Workspace(_)
            | Self::Rasterization(_)
            | Self::PageListing(_)
            | Self::Ocr { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; causes are logged, not returned.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidFileType => "Only PDF files are supported".to_string(),
            Self::MissingFile => "No file provided".to_string(),
            Self::InvalidMultipart(_) | Self::UploadRead(_) => "Failed to read upload".to_string(),
            Self::Workspace(_) => "Failed to prepare workspace".to_string(),
            Self::Rasterization(_) => "Failed to convert PDF to images".to_string(),
            Self::PageListing(_) => "Failed to list page images".to_string(),
            Self::Ocr { path, .. } => format!("OCR failed on {}", path.display()),
        }
    }
}

impl IntoResponse for OcrPdfError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected upload: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });

        (status, body).into_response()
    }
}
