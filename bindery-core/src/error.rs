//! Error types for bindery-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from OOXML package operations.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The package file did not exist at the given path.
    #[error("package not found at {path}")]
    NotFound { path: PathBuf },

    /// The file exists but is not a readable DOCX package — includes what
    /// went wrong (bad zip, missing document part, invalid UTF-8).
    #[error("invalid docx package at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    /// Zip assembly error while rebuilding the package (write path).
    #[error("failed to rebuild package: {0}")]
    Rebuild(#[from] zip::result::ZipError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`PackageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PackageError {
    PackageError::Io {
        path: path.into(),
        source,
    }
}

/// Errors raised while building a render context from caller-supplied JSON.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The top level of a render context must be a JSON object.
    #[error("render context must be a JSON object, got {found}")]
    NotAMapping { found: &'static str },

    /// The supplied context string was not valid JSON.
    #[error("invalid context JSON: {0}")]
    Json(#[from] serde_json::Error),
}
