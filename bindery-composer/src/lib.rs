//! Document composition — merge rendered DOCX files into one document.
//!
//! Public API surface:
//! - [`merge::merge`] — plain merge with optional separators
//! - [`merge::merge_with_sections`] — merge with a heading title per document
//! - [`merge::with_section_heading`] — one document, heading prepended
//! - [`error`] — [`ComposeError`]

pub mod error;
pub mod merge;

pub use error::ComposeError;
pub use merge::{
    merge, merge_with_sections, with_section_heading, DocumentSection, MergeOptions,
    SeparatorKind,
};
