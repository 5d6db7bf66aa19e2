//! Configuration management for the OCR PDF server

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::ocr::OcrProvider;
use crate::pipeline::PageOrdering;

/// Default request body limit (100 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub pipeline: PipelineConfig,
    pub rasterizer: RasterizerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Whether `/ocr-pdf` requires an `X-API-Key` header
    pub enabled: bool,
    /// Expected credential. With `enabled` set and no key, every request is rejected.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Parent directory for per-request workspaces (system temp dir when unset)
    pub work_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub page_ordering: PageOrdering,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RasterizerConfig {
    pub pdftoppm_path: String,
    pub dpi: Option<u32>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub provider: OcrProvider,
    pub tesseract_path: String,
    pub language: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub timeout: Option<Duration>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            auth: AuthConfig {
                enabled: false,
                api_key: None,
            },
            pipeline: PipelineConfig {
                work_dir: None,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                page_ordering: PageOrdering::Numeric,
            },
            rasterizer: RasterizerConfig {
                pdftoppm_path: "pdftoppm".to_string(),
                dpi: None,
                timeout: None,
            },
            ocr: OcrConfig {
                provider: OcrProvider::Tesseract,
                tesseract_path: "tesseract".to_string(),
                language: "eng".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
                timeout: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Unset and empty variables fall back to [`Config::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let api_key = get("API_KEY");
        let enabled = match get("AUTH_ENABLED") {
            Some(value) => parse_bool("AUTH_ENABLED", &value)?,
            None => api_key.is_some(),
        };

        let page_ordering = match get("PAGE_ORDER") {
            Some(value) => value
                .parse::<PageOrdering>()
                .map_err(|reason| invalid("PAGE_ORDER", &value, reason))?,
            None => defaults.pipeline.page_ordering,
        };

        let provider = match get("OCR_PROVIDER") {
            Some(value) => value
                .parse::<OcrProvider>()
                .map_err(|reason| invalid("OCR_PROVIDER", &value, reason))?,
            None => defaults.ocr.provider,
        };

        Ok(Config {
            server: ServerConfig {
                host: get("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_opt("SERVER_PORT", get("SERVER_PORT"))?
                    .unwrap_or(defaults.server.port),
            },
            auth: AuthConfig { enabled, api_key },
            pipeline: PipelineConfig {
                work_dir: get("WORK_DIR").map(PathBuf::from),
                max_upload_bytes: parse_opt("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"))?
                    .unwrap_or(defaults.pipeline.max_upload_bytes),
                page_ordering,
            },
            rasterizer: RasterizerConfig {
                pdftoppm_path: get("PDFTOPPM_PATH").unwrap_or(defaults.rasterizer.pdftoppm_path),
                dpi: parse_opt("RASTER_DPI", get("RASTER_DPI"))?,
                timeout: parse_opt("RASTERIZE_TIMEOUT_SECS", get("RASTERIZE_TIMEOUT_SECS"))?
                    .map(Duration::from_secs),
            },
            ocr: OcrConfig {
                provider,
                tesseract_path: get("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                language: get("OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                ollama_url: get("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: get("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
                timeout: parse_opt("OCR_TIMEOUT_SECS", get("OCR_TIMEOUT_SECS"))?
                    .map(Duration::from_secs),
            },
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_opt<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| v.trim().parse::<T>().map_err(|e| invalid(var, &v, e)))
        .transpose()
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected a boolean")),
    }
}
