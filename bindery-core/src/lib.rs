//! Bindery core library — context values, OOXML package handling, errors.
//!
//! Public API surface:
//! - [`types`] — [`ContextValue`] tree, [`RenderContext`], [`ValidationReport`]
//! - [`package`] — [`DocxPackage`] open / read / rebuild
//! - [`error`] — [`PackageError`], [`ContextError`]

pub mod error;
pub mod package;
pub mod types;

pub use error::{ContextError, PackageError};
pub use package::DocxPackage;
pub use types::{ContextValue, RenderContext, Scalar, ValidationReport};
