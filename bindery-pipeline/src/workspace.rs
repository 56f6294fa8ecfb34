//! Transient workspace for batch runs.
//!
//! Every pipeline invocation renders into its own uniquely named directory
//! so concurrent runs never collide. The directory is deleted when the
//! workspace is dropped; [`BatchWorkspace::close`] deletes it eagerly and
//! surfaces cleanup errors instead of swallowing them.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{io_err, PipelineError};

/// Directory holding one batch's rendered documents.
pub struct BatchWorkspace {
    dir: TempDir,
}

impl BatchWorkspace {
    /// Create a fresh workspace under `temp_area`, or under the system temp
    /// directory when no area is given. The area is created if missing.
    pub fn create(temp_area: Option<&Path>) -> Result<Self, PipelineError> {
        let base_label = temp_area.unwrap_or(Path::new("<system temp>"));
        let dir = match temp_area {
            Some(base) => {
                fs::create_dir_all(base).map_err(|e| io_err(base, e))?;
                tempfile::Builder::new()
                    .prefix("bindery-batch-")
                    .tempdir_in(base)
            }
            None => tempfile::Builder::new().prefix("bindery-batch-").tempdir(),
        }
        .map_err(|e| io_err(base_label, e))?;

        tracing::debug!(path = %dir.path().display(), "created batch workspace");
        Ok(BatchWorkspace { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for the rendered document at `index`. Zero-padded names keep
    /// directory listings in batch order.
    pub fn document_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("doc_{index:04}.docx"))
    }

    /// Delete the workspace now, reporting any cleanup failure.
    pub fn close(self) -> Result<(), PipelineError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| io_err(&path, e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
