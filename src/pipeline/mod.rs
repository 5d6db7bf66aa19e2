//! Upload-to-text Pipeline
//!
//! Drives one uploaded PDF through the stages below, strictly in sequence:
//!
//! 1. Validate the declared file name
//! 2. Acquire a private workspace
//! 3. Write the upload to `<workspace>/input.pdf`
//! 4. Rasterize it to `<workspace>/page-<n>.png`
//! 5. OCR the pages in order and join their text
//!
//! Any failure ends the request; the workspace is removed on every path.

pub mod aggregator;

use std::sync::Arc;

pub use aggregator::{aggregate, list_page_images, PageOrdering, PAGE_SEPARATOR};

use crate::config::Config;
use crate::error::{OcrPdfError, Result};
use crate::ocr::{OcrError, OcrService};
use crate::rasterizer::{PdftoppmRasterizer, Rasterizer};
use crate::workspace::{Workspace, WorkspaceManager};

/// Output prefix handed to the rasterizer
pub const PAGE_PREFIX: &str = "page";

/// An uploaded file: its declared name and full contents
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Only the name is checked; content is not sniffed.
pub fn is_pdf_file_name(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".pdf")
}

/// The PDF-to-text pipeline shared by all requests
#[derive(Clone)]
pub struct OcrPipeline {
    workspaces: WorkspaceManager,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: OcrService,
    ordering: PageOrdering,
}

impl OcrPipeline {
    pub fn new(
        workspaces: WorkspaceManager,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: OcrService,
        ordering: PageOrdering,
    ) -> Self {
        Self {
            workspaces,
            rasterizer,
            ocr,
            ordering,
        }
    }

    /// Build the pipeline with `pdftoppm` and the configured OCR provider
    pub fn from_config(config: &Config) -> std::result::Result<Self, OcrError> {
        Ok(Self::new(
            WorkspaceManager::new(config.pipeline.work_dir.clone()),
            Arc::new(PdftoppmRasterizer::from_config(&config.rasterizer)),
            OcrService::from_config(&config.ocr)?,
            config.pipeline.page_ordering,
        ))
    }

    pub fn ocr(&self) -> &OcrService {
        &self.ocr
    }

    /// Extract the text of an uploaded PDF
    pub async fn process(&self, upload: &Upload) -> Result<String> {
        if !is_pdf_file_name(&upload.file_name) {
            return Err(OcrPdfError::InvalidFileType);
        }

        let workspace = self.workspaces.acquire().map_err(OcrPdfError::Workspace)?;
        let result = self.run(&workspace, upload).await;
        workspace.release();

        result
    }

    async fn run(&self, workspace: &Workspace, upload: &Upload) -> Result<String> {
        let input = workspace.input_path();
        tokio::fs::write(&input, &upload.data)
            .await
            .map_err(OcrPdfError::Workspace)?;

        tracing::debug!(
            file_name = %upload.file_name,
            bytes = upload.data.len(),
            "Upload written to workspace"
        );

        self.rasterizer
            .rasterize(&input, workspace.path(), PAGE_PREFIX)
            .await?;

        aggregate(workspace.path(), PAGE_PREFIX, self.ordering, &self.ocr).await
    }
}
