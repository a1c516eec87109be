//! Best-effort text extraction with per-format fallback chains.
//!
//! ## Contract
//!
//! Extraction never fails with an error the caller has to unwind. A missing
//! file, a corrupt archive, a scanned PDF without a text layer, a parser
//! panic: all of them end as an [`ExtractionFailure`] on the returned
//! `Result`, which [`crate::Material::from_extraction`] stores next to the
//! label. The absence of text is the signal.
//!
//! ## Strategy chains
//!
//! Each format is an ordered list of [`Strategy`] values, each a plain
//! `bytes -> Option<String>` function. [`run_chain`] tries them in order and
//! the first non-blank result wins. Every stage runs inside
//! [`std::panic::catch_unwind`] because several of the underlying parsers
//! panic on malformed input instead of returning an error.
//!
//! Every stage reads from a fully buffered byte slice; nothing parses from a
//! live file handle.

pub mod markup;
pub mod office;
pub mod pdf;
pub mod rtf;

use crate::config::ExtractionConfig;
use crate::document::{DocumentFormat, DocumentSource, SourceDocument};
use crate::error::ExtractionFailure;
use crate::pipeline::input;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, warn};

/// One named extraction attempt.
pub struct Strategy<'a> {
    pub name: &'static str,
    pub run: Box<dyn Fn(&[u8]) -> Option<String> + 'a>,
}

impl<'a> Strategy<'a> {
    pub fn new(name: &'static str, run: impl Fn(&[u8]) -> Option<String> + 'a) -> Self {
        Self {
            name,
            run: Box::new(run),
        }
    }
}

/// Run `strategies` in order; the first one yielding non-whitespace text wins.
pub fn run_chain(strategies: &[Strategy<'_>], bytes: &[u8]) -> Option<String> {
    for s in strategies {
        match catch_unwind(AssertUnwindSafe(|| (s.run)(bytes))) {
            Ok(Some(text)) if !text.trim().is_empty() => {
                debug!("Extraction stage '{}' produced {} chars", s.name, text.len());
                return Some(text);
            }
            Ok(_) => debug!("Extraction stage '{}' produced no text", s.name),
            Err(_) => debug!("Extraction stage '{}' panicked", s.name),
        }
    }
    None
}

/// Converts documents into plain text.
#[derive(Debug, Clone, Default)]
pub struct TextExtractor {
    config: ExtractionConfig,
}

impl TextExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Extract a [`SourceDocument`], resolving its format first.
    pub fn extract(&self, doc: &SourceDocument) -> Result<String, ExtractionFailure> {
        let format = doc.format();
        match &doc.source {
            DocumentSource::Path(p) => self.extract_resolved(p, &doc.label, format),
            DocumentSource::Bytes(b) => self.extract_inline(b, &doc.label, format),
        }
    }

    /// Like [`Self::extract`] but collapses every failure to `""`.
    pub fn extract_text(&self, doc: &SourceDocument) -> String {
        self.extract(doc).unwrap_or_default()
    }

    /// Extract a stored document. An empty `declared_format` is inferred from
    /// the path's extension.
    pub fn extract_path(
        &self,
        location: impl AsRef<Path>,
        declared_format: &str,
    ) -> Result<String, ExtractionFailure> {
        let location = location.as_ref();
        let format = if declared_format.trim().is_empty() {
            DocumentFormat::from_path(location)
        } else {
            DocumentFormat::from_declared(declared_format)
        };
        let label = location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.display().to_string());
        self.extract_resolved(location, &label, format)
    }

    /// Extract inline content. An empty `declared_format` is sniffed from the
    /// leading bytes.
    ///
    /// The bytes are written to a temp file and handed to the path-based
    /// extractor. The temp file is deleted on every exit path.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        declared_format: &str,
    ) -> Result<String, ExtractionFailure> {
        let format = if declared_format.trim().is_empty() {
            DocumentFormat::sniff(bytes)
        } else {
            DocumentFormat::from_declared(declared_format)
        };
        self.extract_inline(bytes, "inline document", format)
    }

    fn extract_inline(
        &self,
        bytes: &[u8],
        label: &str,
        format: DocumentFormat,
    ) -> Result<String, ExtractionFailure> {
        match input::materialize(bytes, format.as_str()) {
            Ok(tmp) => self.extract_resolved(tmp.path(), label, format),
            Err(e) => {
                warn!("Could not materialize '{}' ({}), extracting in memory", label, e);
                self.finish(extract_from_bytes(bytes, format, &self.config), label, format)
            }
        }
    }

    fn extract_resolved(
        &self,
        location: &Path,
        label: &str,
        format: DocumentFormat,
    ) -> Result<String, ExtractionFailure> {
        let Some(path) = input::resolve_path(location, &self.config) else {
            debug!("'{}' not found at {}", label, location.display());
            return Err(ExtractionFailure::NotFound {
                location: location.to_path_buf(),
            });
        };
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                debug!("'{}' unreadable at {}: {}", label, path.display(), e);
                return Err(ExtractionFailure::NotFound { location: path });
            }
        };
        self.finish(extract_from_bytes(&bytes, format, &self.config), label, format)
    }

    fn finish(
        &self,
        text: Option<String>,
        label: &str,
        format: DocumentFormat,
    ) -> Result<String, ExtractionFailure> {
        text.ok_or_else(|| ExtractionFailure::NoExtractableText {
            label: label.to_string(),
            format: format.to_string(),
        })
    }
}

/// Dispatch a fully buffered document to its format's strategy chain.
///
/// Returns `None` for empty input, legacy binary formats, and unknown formats.
pub fn extract_from_bytes(
    bytes: &[u8],
    format: DocumentFormat,
    config: &ExtractionConfig,
) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    match format {
        DocumentFormat::Pdf => run_chain(&pdf::strategies(config), bytes),
        DocumentFormat::Docx => run_chain(&[Strategy::new("docx", office::docx_text)], bytes),
        DocumentFormat::Odt => run_chain(&[Strategy::new("odt", office::odt_text)], bytes),
        DocumentFormat::Rtf => run_chain(&rtf::strategies(), bytes),
        DocumentFormat::Html => run_chain(&[Strategy::new("html", markup::html_text)], bytes),
        DocumentFormat::Text => run_chain(&[Strategy::new("plain", markup::plain_text)], bytes),
        DocumentFormat::LegacyDoc => {
            debug!("Legacy .doc has no safe extractor");
            None
        }
        DocumentFormat::Unknown => None,
    }
}
