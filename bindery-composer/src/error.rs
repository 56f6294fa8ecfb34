//! Error types for bindery-composer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from merge operations.
///
/// Per-document failures always carry the zero-based position of the
/// offending input alongside its path; any single failure aborts the whole
/// merge with no partial output.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Merging needs at least two inputs — both an empty list and a single
    /// document are rejected.
    #[error("at least 2 documents are required to merge, got {count}")]
    InsufficientInput { count: usize },

    /// An input document did not exist.
    #[error("document {index} not found at {path}")]
    DocumentNotFound { index: usize, path: PathBuf },

    /// An input document exists but is not a readable DOCX package.
    #[error("document {index} at {path} is not a valid docx package: {detail}")]
    DocumentCorrupt {
        index: usize,
        path: PathBuf,
        detail: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The merged document could not be assembled into package bytes.
    #[error("failed to assemble merged document: {0}")]
    Build(String),
}

/// Convenience constructor for [`ComposeError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ComposeError {
    ComposeError::Io {
        path: path.into(),
        source,
    }
}
