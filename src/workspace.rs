//! Per-request Workspaces
//!
//! Every `/ocr-pdf` request gets its own uniquely named scratch directory.
//! The directory is owned by a [`Workspace`] value and removed when that
//! value goes away, whichever way the request ends. [`Workspace::release`]
//! is the normal path and reports cleanup problems through the log; the
//! `Drop` impl of the underlying [`tempfile::TempDir`] covers early returns
//! and panics.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Name prefix for workspace directories
pub const WORKSPACE_PREFIX: &str = "ocr-pdf-";

/// Fixed name of the uploaded PDF inside a workspace
pub const INPUT_FILE_NAME: &str = "input.pdf";

/// Creates workspaces under a root directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager rooted at `root`, or the system temp dir when `None`
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root: root.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Create a new, empty workspace with exclusive access for the caller
    pub fn acquire(&self) -> io::Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.root)?;

        tracing::debug!(workspace = %dir.path().display(), "Workspace acquired");

        Ok(Workspace { dir })
    }
}

/// An exclusively owned scratch directory for one request
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path the uploaded PDF is written to
    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join(INPUT_FILE_NAME)
    }

    /// Recursively delete the workspace.
    ///
    /// Failures are logged and swallowed: by the time a workspace is
    /// released the response has already been decided.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(workspace = %path.display(), "Workspace released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(workspace = %path.display(), "Workspace already removed");
            }
            Err(e) => {
                tracing::warn!(
                    workspace = %path.display(),
                    error = %e,
                    "Failed to remove workspace"
                );
            }
        }
    }
}
