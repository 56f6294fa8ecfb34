//! Document merge — combine several DOCX files into one document.
//!
//! Each input's body content (paragraphs, tables, bookmarks) is relocated
//! into an aggregate document in input order; the content itself is never
//! reinterpreted. Separators are inserted strictly *between* adjacent
//! documents — N inputs yield N−1 separators, never one before the first or
//! after the last. Sectioned merges instead put a Heading 1 title before
//! every document's content, the first included.

use std::path::{Path, PathBuf};

use docx_rs::{
    BreakType, Docx, DocumentChild, Paragraph, Run, Style, StyleType,
};

use crate::error::{io_err, ComposeError};

/// Style id of the section-title headings in a sectioned merge.
const HEADING_STYLE_ID: &str = "Heading1";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to insert between two adjacent documents' content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorKind {
    /// A paragraph holding a page break — the next document starts on a new
    /// page.
    PageBreak,
    /// An empty paragraph — a visible gap without a page boundary.
    BlankParagraph,
}

/// Options for [`merge`]. The default inserts no separator.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub separator: Option<SeparatorKind>,
}

/// One input to [`merge_with_sections`]: a document plus its heading title.
#[derive(Debug, Clone)]
pub struct DocumentSection {
    pub path: PathBuf,
    pub title: String,
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Merge `documents` into a single DOCX, returning the package bytes.
///
/// Content order equals input order. Fails with
/// [`ComposeError::InsufficientInput`] for fewer than two inputs, and with
/// an index-carrying error if any input is missing or unreadable; no output
/// is produced in that case.
pub fn merge(documents: &[PathBuf], options: &MergeOptions) -> Result<Vec<u8>, ComposeError> {
    if documents.len() < 2 {
        return Err(ComposeError::InsufficientInput {
            count: documents.len(),
        });
    }

    let mut merged = Docx::new();
    let mut expected_blocks = 0usize;

    for (index, path) in documents.iter().enumerate() {
        if index > 0 {
            if let Some(kind) = options.separator {
                merged = merged.add_paragraph(separator_paragraph(kind));
                expected_blocks += 1;
            }
        }
        let source = read_document(index, path)?;
        expected_blocks += source.document.children.len();
        merged = relocate(merged, source);
        tracing::debug!(index, path = %path.display(), "relocated document content");
    }

    debug_assert_eq!(
        merged.document.children.len(),
        expected_blocks,
        "merged block count must equal relocated content plus separators"
    );

    tracing::info!(documents = documents.len(), "merged documents");
    pack(merged)
}

/// Merge documents with a Heading 1 title before each one's content.
///
/// The aggregate document defines the heading style; the same input rules
/// as [`merge`] apply.
pub fn merge_with_sections(sections: &[DocumentSection]) -> Result<Vec<u8>, ComposeError> {
    if sections.len() < 2 {
        return Err(ComposeError::InsufficientInput {
            count: sections.len(),
        });
    }
    build_sections(sections)
}

/// Rebuild a single document with its heading title prepended.
///
/// A one-document "merge" is a no-op the composer refuses, but a sectioned
/// run still owes the caller its heading; this covers that case.
pub fn with_section_heading(section: &DocumentSection) -> Result<Vec<u8>, ComposeError> {
    build_sections(std::slice::from_ref(section))
}

fn build_sections(sections: &[DocumentSection]) -> Result<Vec<u8>, ComposeError> {
    let mut merged = Docx::new().add_style(heading_style());
    let mut expected_blocks = 0usize;

    for (index, section) in sections.iter().enumerate() {
        let source = read_document(index, &section.path)?;
        expected_blocks += source.document.children.len() + 1;
        merged = merged.add_paragraph(heading_paragraph(&section.title));
        merged = relocate(merged, source);
        tracing::debug!(index, title = %section.title, "relocated section content");
    }

    debug_assert_eq!(
        merged.document.children.len(),
        expected_blocks,
        "merged block count must equal relocated content plus headings"
    );

    tracing::info!(sections = sections.len(), "merged sections");
    pack(merged)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn read_document(index: usize, path: &Path) -> Result<Docx, ComposeError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ComposeError::DocumentNotFound {
                index,
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(io_err(path, e)),
    };
    docx_rs::read_docx(&bytes).map_err(|e| ComposeError::DocumentCorrupt {
        index,
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Move every body block of `source` to the end of `target`, in order.
fn relocate(mut target: Docx, source: Docx) -> Docx {
    for child in source.document.children {
        match child {
            DocumentChild::Paragraph(p) => target = target.add_paragraph(*p),
            DocumentChild::Table(t) => target = target.add_table(*t),
            // Bookmarks, comment ranges and the like move as-is.
            other => target.document.children.push(other),
        }
    }
    target
}

fn separator_paragraph(kind: SeparatorKind) -> Paragraph {
    match kind {
        SeparatorKind::PageBreak => {
            Paragraph::new().add_run(Run::new().add_break(BreakType::Page))
        }
        SeparatorKind::BlankParagraph => Paragraph::new(),
    }
}

fn heading_style() -> Style {
    // 32 half-points = 16pt.
    Style::new(HEADING_STYLE_ID, StyleType::Paragraph)
        .name("heading 1")
        .size(32)
}

fn heading_paragraph(title: &str) -> Paragraph {
    Paragraph::new()
        .style(HEADING_STYLE_ID)
        .add_run(Run::new().add_text(title))
}

fn pack(docx: Docx) -> Result<Vec<u8>, ComposeError> {
    let mut buf = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ComposeError::Build(e.to_string()))?;
    Ok(buf.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_break_separator_carries_a_break_run() {
        let p = separator_paragraph(SeparatorKind::PageBreak);
        assert_eq!(p.children.len(), 1);
    }

    #[test]
    fn blank_separator_is_an_empty_paragraph() {
        let p = separator_paragraph(SeparatorKind::BlankParagraph);
        assert!(p.children.is_empty());
    }

    #[test]
    fn heading_paragraph_uses_the_heading_style() {
        let p = heading_paragraph("Cover");
        assert_eq!(
            p.property.style.as_ref().map(|s| s.val.as_str()),
            Some(HEADING_STYLE_ID)
        );
    }
}
