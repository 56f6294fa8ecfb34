//! OOXML package access — open a DOCX, read its document part, rebuild.
//!
//! A DOCX file is a zip package; the main body lives in `word/document.xml`.
//! [`DocxPackage`] reads the whole package into memory once, keeps every
//! entry in its original order, and can rebuild the package with a replaced
//! document part. The rebuild writes entries in the stored order with a
//! fixed timestamp, so rebuilding with identical content yields identical
//! bytes.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::read::ZipArchive;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::{io_err, PackageError};

/// Zip entry name of the main document part.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Per-entry pre-allocation cap. An entry's declared size comes straight
/// from the zip headers and is untrusted — a tiny package can claim a
/// multi-gigabyte entry. `read_to_end` grows past the cap only as real
/// bytes arrive.
const ENTRY_PREALLOC_CAP: u64 = 1 << 20;

fn entry_capacity(declared: u64) -> usize {
    declared.min(ENTRY_PREALLOC_CAP) as usize
}

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// DocxPackage
// ---------------------------------------------------------------------------

/// An opened DOCX package: ordered entries plus the extracted document XML.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    path: PathBuf,
    entries: Vec<PackageEntry>,
    document_index: usize,
    document_xml: String,
}

impl DocxPackage {
    /// Open a package from a file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackageError> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackageError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(io_err(path, e)),
        };
        Self::parse(path.to_path_buf(), &bytes)
    }

    /// Open a package from in-memory bytes (e.g. an uploaded file).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        Self::parse(PathBuf::from("<memory>"), bytes)
    }

    fn parse(path: PathBuf, bytes: &[u8]) -> Result<Self, PackageError> {
        let corrupt = |path: PathBuf, detail: String| PackageError::Corrupt { path, detail };

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| corrupt(path.clone(), e.to_string()))?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut document_index = None;
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| corrupt(path.clone(), e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(entry_capacity(file.size()));
            file.read_to_end(&mut data)
                .map_err(|e| corrupt(path.clone(), format!("entry {name}: {e}")))?;
            if document_index.is_none() && name == DOCUMENT_PART {
                document_index = Some(entries.len());
            }
            entries.push(PackageEntry { name, bytes: data });
        }

        let document_index = document_index.ok_or_else(|| {
            corrupt(path.clone(), format!("missing {DOCUMENT_PART} part"))
        })?;
        let document_xml = String::from_utf8(entries[document_index].bytes.clone())
            .map_err(|_| corrupt(path.clone(), format!("{DOCUMENT_PART} is not valid UTF-8")))?;

        Ok(DocxPackage {
            path,
            entries,
            document_index,
            document_xml,
        })
    }

    /// Path the package was opened from (`<memory>` for byte input).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw XML of the main document part.
    pub fn document_xml(&self) -> &str {
        &self.document_xml
    }

    /// Entry names in package order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Rebuild the package with `document_xml` as the document part.
    ///
    /// Every other entry is copied verbatim in its original position. The
    /// fixed entry timestamp keeps the output byte-identical across rebuilds
    /// with the same content.
    pub fn pack_with_document(&self, document_xml: &str) -> Result<Vec<u8>, PackageError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for (index, entry) in self.entries.iter().enumerate() {
            writer.start_file(entry.name.as_str(), options)?;
            let bytes = if index == self.document_index {
                document_xml.as_bytes()
            } else {
                entry.bytes.as_slice()
            };
            writer.write_all(bytes).map_err(|e| io_err(&self.path, e))?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    fn zip_with_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        zip_with_entries(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", b"<Relationships/>"),
            ("word/document.xml", document_xml.as_bytes()),
            ("word/styles.xml", b"<w:styles/>"),
        ])
    }

    #[rstest]
    #[case::small_declared_size(100, 100)]
    #[case::exactly_at_the_cap(ENTRY_PREALLOC_CAP, ENTRY_PREALLOC_CAP as usize)]
    #[case::forged_huge_size(u64::MAX, ENTRY_PREALLOC_CAP as usize)]
    #[case::multi_gigabyte_claim(8 << 30, ENTRY_PREALLOC_CAP as usize)]
    fn declared_entry_sizes_never_drive_the_allocation(
        #[case] declared: u64,
        #[case] expected: usize,
    ) {
        assert_eq!(entry_capacity(declared), expected);
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.docx");
        let err = DocxPackage::open(&path).unwrap_err();
        assert!(matches!(err, PackageError::NotFound { path: p } if p == path));
    }

    #[test]
    fn open_reads_document_part() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.docx");
        std::fs::write(&path, docx_bytes("<w:document>hello</w:document>")).unwrap();

        let pkg = DocxPackage::open(&path).unwrap();
        assert_eq!(pkg.document_xml(), "<w:document>hello</w:document>");
        assert_eq!(pkg.path(), path);
    }

    #[rstest]
    #[case::garbage(b"definitely not a zip".to_vec())]
    #[case::missing_document_part(zip_with_entries(&[("[Content_Types].xml", b"<Types/>")]))]
    #[case::non_utf8_document_part(zip_with_entries(&[("word/document.xml", &[0xff, 0xfe, 0x00])]))]
    fn unreadable_input_is_corrupt(#[case] bytes: Vec<u8>) {
        let err = DocxPackage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PackageError::Corrupt { .. }), "got {err:?}");
    }

    #[test]
    fn pack_substitutes_document_part_and_keeps_the_rest() {
        let pkg = DocxPackage::from_bytes(&docx_bytes("<w:document>old</w:document>")).unwrap();
        let rebuilt = pkg.pack_with_document("<w:document>new</w:document>").unwrap();

        let reopened = DocxPackage::from_bytes(&rebuilt).unwrap();
        assert_eq!(reopened.document_xml(), "<w:document>new</w:document>");
        let names: Vec<&str> = reopened.entry_names().collect();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/document.xml",
                "word/styles.xml"
            ],
            "entry order must be preserved"
        );
    }

    #[test]
    fn rebuild_is_byte_deterministic() {
        let pkg = DocxPackage::from_bytes(&docx_bytes("<w:document>x</w:document>")).unwrap();
        let a = pkg.pack_with_document("<w:document>same</w:document>").unwrap();
        let b = pkg.pack_with_document("<w:document>same</w:document>").unwrap();
        assert_eq!(a, b, "identical rebuilds must produce identical bytes");
    }

    #[test]
    fn rebuilt_package_reopens_cleanly() {
        let pkg = DocxPackage::from_bytes(&docx_bytes("<w:document/>")).unwrap();
        let rebuilt = pkg.pack_with_document(pkg.document_xml()).unwrap();
        DocxPackage::from_bytes(&rebuilt).expect("rebuilt package must be a valid package");
    }
}
