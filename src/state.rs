//! Application state management

use std::sync::Arc;

use crate::auth::ApiKeyGate;
use crate::config::Config;
use crate::ocr::OcrError;
use crate::pipeline::OcrPipeline;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize OCR service: {0}")]
    OcrInit(#[from] OcrError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: OcrPipeline,
    gate: ApiKeyGate,
}

impl AppState {
    /// Create the application state from configuration
    pub fn new(config: Config) -> Result<Self, StateError> {
        let pipeline = OcrPipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create the application state around an existing pipeline
    pub fn with_pipeline(config: Config, pipeline: OcrPipeline) -> Self {
        let gate = ApiKeyGate::from_config(&config.auth);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                gate,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the OCR pipeline
    pub fn pipeline(&self) -> &OcrPipeline {
        &self.inner.pipeline
    }

    /// Get the access control gate
    pub fn gate(&self) -> &ApiKeyGate {
        &self.inner.gate
    }
}
