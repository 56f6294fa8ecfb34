//! Pipeline error types.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use bindery_composer::ComposeError;
use bindery_renderer::RenderError;

/// Errors raised while batch-rendering and merging.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no contexts provided; the batch would be empty")]
    EmptyBatch,

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("merge error: {0}")]
    Compose(#[from] ComposeError),

    /// One or more batch items failed to render. Under the fail-fast policy
    /// a single failure is enough; under best-effort this means none rendered.
    #[error("batch rendering failed for {} item(s)", .failures.len())]
    PartialBatchFailure { failures: Vec<BatchFailure> },

    #[error("{titles} section titles supplied for {contexts} contexts")]
    TitleCountMismatch { titles: usize, contexts: usize },

    #[error("worker pool error: {0}")]
    Pool(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One failed batch item: its input position and a one-line reason.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub reason: String,
}

impl BatchFailure {
    /// Capture a failed item, flattening the error's cause chain into the
    /// reason so per-item reports stay self-contained.
    pub fn from_error(index: usize, err: &PipelineError) -> Self {
        let reason = match err {
            PipelineError::Render(e) => e.detail(),
            other => other.to_string(),
        };
        BatchFailure { index, reason }
    }
}

pub(crate) fn io_err(path: impl AsRef<Path>, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    }
}
