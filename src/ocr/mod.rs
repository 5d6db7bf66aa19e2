//! OCR Module
//!
//! Recognizes text in rasterized PDF pages.
//!
//! Supports multiple backends:
//! - Tesseract command-line tool (default)
//! - libtesseract bindings (`ocr-tesseract` feature)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr_pdf_server::ocr::OcrService;
//!
//! let service = OcrService::from_config(&config.ocr)?;
//! let text = service.recognize(Path::new("/tmp/ocr-pdf-x/page-1.png")).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider, TesseractProvider};
pub use service::OcrService;
pub use types::{OcrError, OcrProvider, PageImage};

#[cfg(feature = "ocr-tesseract")]
pub use provider::TesseractNativeProvider;
