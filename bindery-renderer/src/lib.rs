//! DOCX template rendering and placeholder validation.
//!
//! Public API surface:
//! - [`engine`] — [`TemplateRenderer`]: open once, render per context
//! - [`placeholders`] — marker scan backing [`TemplateRenderer::validate`]
//! - [`error`] — [`RenderError`]

pub mod engine;
pub mod error;
pub mod placeholders;

pub use engine::TemplateRenderer;
pub use error::RenderError;

pub use bindery_core::types::{RenderContext, ValidationReport};
