//! Error types for bindery-renderer.

use thiserror::Error;

use bindery_core::error::{ContextError, PackageError};

/// All errors that can arise from template rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template markup itself failed to parse (unclosed tag, bad syntax).
    #[error("template markup error: {0}")]
    TemplateSyntax(#[source] tera::Error),

    /// Substitution failed against the supplied context — e.g. a missing
    /// variable, or a `for` over a scalar.
    #[error("placeholder substitution failed: {0}")]
    Substitution(#[source] tera::Error),

    /// The underlying package could not be opened or rebuilt.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// The render context was rejected at construction.
    #[error("invalid render context: {0}")]
    Context(#[from] ContextError),
}

impl RenderError {
    /// Render the full error chain into one line, for per-item batch reports.
    pub fn detail(&self) -> String {
        use std::error::Error as _;

        let mut out = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            // The top-level message already embeds its direct cause.
            if !out.ends_with(&text) {
                out.push_str(": ");
                out.push_str(&text);
            }
            source = cause.source();
        }
        out
    }
}
