//! Tera-backed DOCX template renderer.
//!
//! A [`TemplateRenderer`] opens the template package once and renders it any
//! number of times against different contexts. Rendering registers the raw
//! `word/document.xml` text as a tera template, substitutes the context, and
//! splices the result back into the package with every other entry copied
//! verbatim — so rendering the same template with the same context twice
//! produces byte-identical output.

use std::collections::BTreeSet;
use std::path::Path;

use tera::Tera;

use bindery_core::package::DocxPackage;
use bindery_core::types::{RenderContext, ValidationReport};

use crate::error::RenderError;
use crate::placeholders;

/// Registered template name. The `.xml` suffix keeps tera's autoescaping
/// active, so substituted values stay XML-safe.
const TEMPLATE_NAME: &str = "document.xml";

// ---------------------------------------------------------------------------
// TemplateRenderer
// ---------------------------------------------------------------------------

/// DOCX template loaded once, rendered per context. Create with
/// [`TemplateRenderer::open`] or [`TemplateRenderer::from_bytes`] and reuse.
#[derive(Debug)]
pub struct TemplateRenderer {
    package: DocxPackage,
}

impl TemplateRenderer {
    /// Open a template from a `.docx` file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        Ok(TemplateRenderer {
            package: DocxPackage::open(path)?,
        })
    }

    /// Open a template from in-memory bytes (e.g. an uploaded file).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        Ok(TemplateRenderer {
            package: DocxPackage::from_bytes(bytes)?,
        })
    }

    /// Path the template was opened from.
    pub fn path(&self) -> &Path {
        self.package.path()
    }

    /// Render the template with `context`, returning complete DOCX bytes.
    pub fn render(&self, context: &RenderContext) -> Result<Vec<u8>, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, self.package.document_xml())
            .map_err(RenderError::TemplateSyntax)?;

        let tera_context =
            tera::Context::from_serialize(context).map_err(RenderError::Substitution)?;
        let rendered = tera
            .render(TEMPLATE_NAME, &tera_context)
            .map_err(RenderError::Substitution)?;

        let bytes = self.package.pack_with_document(&rendered)?;
        tracing::debug!(
            template = %self.package.path().display(),
            bytes = bytes.len(),
            "rendered document"
        );
        Ok(bytes)
    }

    /// Root placeholder names discovered in the template, sorted.
    pub fn placeholders(&self) -> BTreeSet<String> {
        placeholders::scan(self.package.document_xml())
    }

    /// Check the template against a list of required placeholder names.
    ///
    /// Extra placeholders in the template are allowed; only required names
    /// the template never references are reported.
    pub fn validate(&self, required: &[String]) -> ValidationReport {
        let found = self.placeholders();
        let missing = required
            .iter()
            .filter(|name| !found.contains(*name))
            .cloned()
            .collect();
        ValidationReport::from_missing(missing)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::error::PackageError;
    use tempfile::TempDir;

    #[test]
    fn open_missing_template_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = TemplateRenderer::open(dir.path().join("absent.docx")).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Package(PackageError::NotFound { .. })
        ));
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let err = TemplateRenderer::from_bytes(b"not a docx").unwrap_err();
        assert!(matches!(
            err,
            RenderError::Package(PackageError::Corrupt { .. })
        ));
    }
}
