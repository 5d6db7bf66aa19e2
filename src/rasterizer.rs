//! PDF Rasterization
//!
//! Turns an input PDF into one PNG per page by running `pdftoppm`. The
//! rasterizer only writes files; callers re-derive the page list from the
//! output directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::RasterizerConfig;

/// Rasterization errors
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; `code` is `None` when the process was killed by a signal
    #[error("Rasterizer exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Rasterizer timed out after {0:?}")]
    TimedOut(Duration),
}

/// Converts a PDF into page images inside a directory
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Write `<output_dir>/<prefix>-<n>.png` for every page of `input`.
    async fn rasterize(
        &self,
        input: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<(), RasterizeError>;
}

/// `pdftoppm` (poppler-utils) rasterizer
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
    dpi: Option<u32>,
    timeout: Option<Duration>,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dpi: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &RasterizerConfig) -> Self {
        Self {
            program: PathBuf::from(&config.pdftoppm_path),
            dpi: config.dpi,
            timeout: config.timeout,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    fn command(&self, input: &Path, output_prefix: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-png");
        if let Some(dpi) = self.dpi {
            cmd.arg("-r").arg(dpi.to_string());
        }
        cmd.arg(input)
            .arg(output_prefix)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(
        &self,
        input: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<(), RasterizeError> {
        let output_prefix = output_dir.join(prefix);
        let run = self.command(input, &output_prefix).output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| RasterizeError::TimedOut(limit))?,
            None => run.await,
        }
        .map_err(|source| RasterizeError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                program = %self.program.display(),
                status = %output.status,
                stderr = %stderr,
                "Rasterizer failed"
            );
            return Err(RasterizeError::Failed {
                code: output.status.code(),
                stderr,
            });
        }

        tracing::debug!(
            input = %input.display(),
            output_prefix = %output_prefix.display(),
            "PDF rasterized"
        );

        Ok(())
    }
}
