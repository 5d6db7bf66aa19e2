//! OCR Types

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrProvider {
    /// `tesseract` command-line tool
    Tesseract,
    /// libtesseract bindings (requires the `ocr-tesseract` feature)
    TesseractNative,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl Default for OcrProvider {
    fn default() -> Self {
        Self::Tesseract
    }
}

impl OcrProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::TesseractNative => "tesseract-native",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for OcrProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "tesseract-native" => Ok(Self::TesseractNative),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!(
                "unknown OCR provider '{}', expected tesseract, tesseract-native or ollama",
                other
            )),
        }
    }
}

/// A decoded page image ready for recognition
#[derive(Debug, Clone)]
pub struct PageImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Failed to decode page image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("OCR timed out after {0:?}")]
    TimedOut(Duration),

    #[error("API error: {0}")]
    ApiError(String),
}
