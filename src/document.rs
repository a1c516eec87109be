//! Source documents and their declared formats.
//!
//! A [`SourceDocument`] is what the host hands over from its attachment
//! metadata: a display label, a format tag (usually the stored extension),
//! and either a stored location or inline bytes. It is never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Format a document is extracted as.
///
/// Tags are lower-cased and aliased on the way in, so `"HTM"`, `".html"` and
/// `"html"` all dispatch to [`DocumentFormat::Html`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Odt,
    Rtf,
    Html,
    /// Plain text and markdown.
    Text,
    /// Legacy binary Word. Recognised, but there is no safe extractor for it.
    LegacyDoc,
    /// Anything else. Extraction returns `""`.
    Unknown,
}

impl DocumentFormat {
    /// Map a declared extension-like tag to a format.
    pub fn from_declared(tag: &str) -> Self {
        let tag = tag.trim().trim_start_matches('.').to_ascii_lowercase();
        match tag.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "odt" => Self::Odt,
            "rtf" => Self::Rtf,
            "html" | "htm" | "xhtml" => Self::Html,
            "txt" | "text" | "md" | "markdown" => Self::Text,
            "doc" => Self::LegacyDoc,
            _ => Self::Unknown,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_declared)
            .unwrap_or(Self::Unknown)
    }

    /// Guess the format from leading magic bytes.
    ///
    /// ZIP containers are told apart by their member names, so this needs the
    /// whole buffer rather than a prefix.
    pub fn sniff(bytes: &[u8]) -> Self {
        let head = trim_leading_noise(bytes);
        if head.starts_with(b"%PDF-") {
            return Self::Pdf;
        }
        if head.starts_with(b"{\\rtf") {
            return Self::Rtf;
        }
        if head.starts_with(b"PK\x03\x04") {
            return sniff_zip(bytes);
        }
        let prefix: Vec<u8> = head.iter().take(64).map(u8::to_ascii_lowercase).collect();
        if prefix.starts_with(b"<!doctype html") || prefix.starts_with(b"<html") {
            return Self::Html;
        }
        Self::Unknown
    }

    /// Canonical tag used in messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Rtf => "rtf",
            Self::Html => "html",
            Self::Text => "txt",
            Self::LegacyDoc => "doc",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Skip a UTF-8 BOM and leading ASCII whitespace.
fn trim_leading_noise(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn sniff_zip(bytes: &[u8]) -> DocumentFormat {
    let Ok(archive) = zip::ZipArchive::new(std::io::Cursor::new(bytes)) else {
        return DocumentFormat::Unknown;
    };
    let has = |name: &str| archive.file_names().any(|n| n == name);
    if has("word/document.xml") {
        DocumentFormat::Docx
    } else if has("content.xml") {
        DocumentFormat::Odt
    } else {
        DocumentFormat::Unknown
    }
}

/// Where a document's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A stored location, possibly relative to the host's upload base.
    Path(PathBuf),
    /// Content stored inline rather than on a filesystem.
    Bytes(Vec<u8>),
}

/// An immutable document as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Display name, used in prompt headers and failure messages.
    pub label: String,
    /// Extension-like tag recorded with the upload. May be empty.
    pub declared_format: String,
    pub source: DocumentSource,
}

impl SourceDocument {
    pub fn from_path(
        label: impl Into<String>,
        declared_format: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            declared_format: declared_format.into(),
            source: DocumentSource::Path(path.into()),
        }
    }

    pub fn from_bytes(
        label: impl Into<String>,
        declared_format: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            label: label.into(),
            declared_format: declared_format.into(),
            source: DocumentSource::Bytes(bytes.into()),
        }
    }

    /// Resolve the effective format.
    ///
    /// The declared tag wins when present. Otherwise the stored path's
    /// extension is used, then the label's, then magic bytes for inline content.
    pub fn format(&self) -> DocumentFormat {
        if !self.declared_format.trim().is_empty() {
            return DocumentFormat::from_declared(&self.declared_format);
        }
        let from_label = DocumentFormat::from_path(Path::new(&self.label));
        match &self.source {
            DocumentSource::Path(p) => match DocumentFormat::from_path(p) {
                DocumentFormat::Unknown => from_label,
                f => f,
            },
            DocumentSource::Bytes(b) => match from_label {
                DocumentFormat::Unknown => DocumentFormat::sniff(b),
                f => f,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn declared_tags_are_case_and_dot_insensitive() {
        assert_eq!(DocumentFormat::from_declared("PDF"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_declared(".htm"), DocumentFormat::Html);
        assert_eq!(DocumentFormat::from_declared("Markdown"), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_declared("doc"), DocumentFormat::LegacyDoc);
        assert_eq!(DocumentFormat::from_declared("xlsx"), DocumentFormat::Unknown);
        assert_eq!(DocumentFormat::from_declared(""), DocumentFormat::Unknown);
    }

    #[test]
    fn sniff_simple_signatures() {
        assert_eq!(DocumentFormat::sniff(b"%PDF-1.7\n..."), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::sniff(b"{\\rtf1\\ansi hi}"), DocumentFormat::Rtf);
        assert_eq!(
            DocumentFormat::sniff(b"\xEF\xBB\xBF  <!DOCTYPE html><html></html>"),
            DocumentFormat::Html
        );
        assert_eq!(DocumentFormat::sniff(b"plain words"), DocumentFormat::Unknown);
        assert_eq!(DocumentFormat::sniff(b""), DocumentFormat::Unknown);
    }

    #[test]
    fn sniff_zip_members() {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            w.start_file("content.xml", opts).unwrap();
            w.write_all(b"<office:document-content/>").unwrap();
            w.finish().unwrap();
        }
        assert_eq!(DocumentFormat::sniff(buf.get_ref()), DocumentFormat::Odt);
    }

    #[test]
    fn declared_format_wins_over_path() {
        let d = SourceDocument::from_path("notes", "txt", "uploads/notes.pdf");
        assert_eq!(d.format(), DocumentFormat::Text);
    }

    #[test]
    fn format_falls_back_to_path_then_label() {
        let d = SourceDocument::from_path("week1.docx", "", "uploads/abc123");
        assert_eq!(d.format(), DocumentFormat::Docx);

        let d = SourceDocument::from_path("x", "", "uploads/exam.PDF");
        assert_eq!(d.format(), DocumentFormat::Pdf);
    }

    #[test]
    fn inline_bytes_are_sniffed_without_a_tag() {
        let d = SourceDocument::from_bytes("blob", "", b"{\\rtf1 hello}".to_vec());
        assert_eq!(d.format(), DocumentFormat::Rtf);
    }
}
