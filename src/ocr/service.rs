//! OCR Service
//!
//! Decodes a page image from disk and hands it to the configured provider.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{
    provider::{OcrProviderTrait, OllamaProvider, TesseractProvider},
    types::{OcrError, OcrProvider, PageImage},
};
use crate::config::OcrConfig;

/// OCR service for recognizing rasterized PDF pages
#[derive(Clone)]
pub struct OcrService {
    provider: Arc<dyn OcrProviderTrait>,
    timeout: Option<Duration>,
}

impl OcrService {
    /// Create a service around an explicit provider
    pub fn new(provider: Arc<dyn OcrProviderTrait>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    /// Create the provider selected in the configuration
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let provider: Arc<dyn OcrProviderTrait> = match config.provider {
            OcrProvider::Tesseract => Arc::new(TesseractProvider::new(
                &config.tesseract_path,
                &config.language,
            )),
            #[cfg(feature = "ocr-tesseract")]
            OcrProvider::TesseractNative => Arc::new(
                super::provider::TesseractNativeProvider::new(&config.language),
            ),
            #[cfg(not(feature = "ocr-tesseract"))]
            OcrProvider::TesseractNative => {
                return Err(OcrError::ProviderNotAvailable(
                    "tesseract-native requires the ocr-tesseract feature".to_string(),
                ))
            }
            OcrProvider::Ollama => Arc::new(OllamaProvider::new(
                &config.ollama_url,
                &config.ollama_model,
                &config.language,
            )),
        };

        Ok(Self {
            provider,
            timeout: config.timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_type(&self) -> OcrProvider {
        self.provider.provider_type()
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Recognize the text of the image at `path`.
    ///
    /// Undecodable images fail here, before any provider is called.
    pub async fn recognize(&self, path: &Path) -> Result<String, OcrError> {
        let page = load_page_image(path).await?;

        let recognize = self.provider.recognize(&page);
        let text = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, recognize)
                .await
                .map_err(|_| OcrError::TimedOut(limit))??,
            None => recognize.await?,
        };

        tracing::debug!(
            page = %path.display(),
            width = page.width,
            height = page.height,
            chars = text.len(),
            "Page recognized"
        );

        Ok(text)
    }
}

/// Decode the image to validate it and read its dimensions
async fn load_page_image(path: &Path) -> Result<PageImage, OcrError> {
    let owned = path.to_path_buf();
    let image = tokio::task::spawn_blocking(move || image::open(&owned))
        .await
        .map_err(|e| OcrError::ProcessingError(format!("Image decode task failed: {}", e)))??;

    Ok(PageImage {
        path: path.to_path_buf(),
        width: image.width(),
        height: image.height(),
    })
}
