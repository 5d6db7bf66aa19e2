//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::types::{OcrError, OcrProvider, PageImage};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Recognize the text of one page image. An empty string is a valid result.
    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError>;
}

/// Tesseract OCR via the command-line tool
pub struct TesseractProvider {
    program: PathBuf,
    language: String,
}

impl TesseractProvider {
    pub fn new(program: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            program: program.into(),
            language: language.to_string(),
        }
    }

    fn command(&self, page: &PageImage) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&page.path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
        let output = self.command(page).output().await.map_err(|e| {
            OcrError::ProcessingError(format!(
                "Failed to run {}: {}",
                self.program.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Tesseract OCR through libtesseract
#[cfg(feature = "ocr-tesseract")]
pub struct TesseractNativeProvider {
    language: String,
}

#[cfg(feature = "ocr-tesseract")]
impl TesseractNativeProvider {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

#[cfg(feature = "ocr-tesseract")]
#[async_trait]
impl OcrProviderTrait for TesseractNativeProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::TesseractNative
    }

    async fn is_available(&self) -> bool {
        let language = self.language.clone();
        tokio::task::spawn_blocking(move || tesseract::Tesseract::new(None, Some(language.as_str())).is_ok())
            .await
            .unwrap_or(false)
    }

    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
        let language = self.language.clone();
        let path = page.path.to_string_lossy().into_owned();

        // libtesseract calls block
        tokio::task::spawn_blocking(move || {
            let mut engine = tesseract::Tesseract::new(None, Some(language.as_str()))
                .map_err(|e| OcrError::ProviderNotAvailable(e.to_string()))?
                .set_image(&path)
                .map_err(|e| OcrError::ProcessingError(e.to_string()))?;
            engine
                .get_text()
                .map_err(|e| OcrError::ProcessingError(e.to_string()))
        })
        .await
        .map_err(|e| OcrError::ProcessingError(format!("OCR task panicked: {}", e)))?
    }
}

/// Body of a non-streaming `/api/generate` reply
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

/// Ollama vision model provider
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
    /// Language hint passed in the prompt
    language: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, language: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            language: language.to_string(),
        }
    }

    fn request_body(&self, image_data: &[u8]) -> serde_json::Value {
        use base64::Engine;

        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);
        let prompt = format!(
            "Extract all text from this image exactly as written. The text is in {}. \
             Return only the extracted text, nothing else.",
            self.language
        );

        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        })
    }
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
        let image_data = tokio::fs::read(&page.path).await.map_err(|e| {
            OcrError::ProcessingError(format!("Failed to read {}: {}", page.path.display(), e))
        })?;

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.request_body(&image_data))
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        // A 200 can still carry an error instead of text
        match result {
            GenerateResponse {
                error: Some(error), ..
            } => Err(OcrError::ApiError(format!("Ollama error: {}", error))),
            GenerateResponse {
                response: Some(text),
                ..
            } => Ok(text),
            GenerateResponse { response: None, .. } => Err(OcrError::ApiError(
                "Ollama reply has no response text".to_string(),
            )),
        }
    }
}
