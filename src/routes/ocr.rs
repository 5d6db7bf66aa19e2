//! PDF OCR endpoint
//!
//! `POST /ocr-pdf` takes a multipart upload with a `file` field and returns
//! `{"text": "..."}` or `{"error": "..."}`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{OcrPdfError, Result};
use crate::pipeline::{is_pdf_file_name, Upload};
use crate::state::AppState;

/// Multipart field holding the PDF
pub const FILE_FIELD: &str = "file";

/// Successful OCR response
#[derive(Debug, Serialize)]
pub struct OcrPdfResponse {
    pub text: String,
}

pub async fn ocr_pdf(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrPdfResponse>> {
    let span = tracing::info_span!("ocr_pdf", request_id = %Uuid::new_v4());
    process_upload(state, multipart).instrument(span).await
}

async fn process_upload(
    state: AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrPdfResponse>> {
    let upload = read_upload(multipart?).await?;
    tracing::info!(
        file_name = %upload.file_name,
        bytes = upload.data.len(),
        "PDF received"
    );

    let text = state.pipeline().process(&upload).await?;
    tracing::info!(chars = text.len(), "PDF OCR complete");

    Ok(Json(OcrPdfResponse { text }))
}

/// Pull the `file` field out of the form, rejecting non-PDF names before
/// the body is read.
async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !is_pdf_file_name(&file_name) {
            return Err(OcrPdfError::InvalidFileType);
        }

        let data = field.bytes().await?;
        return Ok(Upload::new(file_name, data.to_vec()));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(OcrPdfError::MissingFile)
}
