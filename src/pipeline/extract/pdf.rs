//! PDF text extraction: three independent stages.
//!
//! 1. `lopdf` walks each page's content stream and decodes text operators.
//!    Fast and exact for digitally produced PDFs.
//! 2. `pdf-extract` lays glyphs out by position, inserting line breaks and
//!    spacing from the page geometry. Recovers documents whose content
//!    streams confuse the first stage (odd font encodings, Type3 fonts).
//! 3. `pdfium` is a separate engine entirely. It is only used when a library
//!    is already present: the configured path, one cached by `pdfium-auto`,
//!    or a system install. Extraction never downloads anything.
//!
//! A scanned PDF without a text layer comes out of all three stages empty.

use super::Strategy;
use crate::config::ExtractionConfig;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The ordered chain for PDF input.
pub fn strategies(config: &ExtractionConfig) -> Vec<Strategy<'static>> {
    let library = config.pdfium_library_path.clone();
    vec![
        Strategy::new("lopdf", lopdf_text),
        Strategy::new("pdf-extract", layout_text),
        Strategy::new("pdfium", move |bytes| pdfium_text(bytes, library.as_deref())),
    ]
}

/// Per-page content-stream text via `lopdf`.
pub fn lopdf_text(bytes: &[u8]) -> Option<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| debug!("lopdf: load failed: {e}"))
        .ok()?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = pages
        .iter()
        .filter_map(|n| doc.extract_text(&[*n]).ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(text)
}

/// Geometry-aware text via `pdf-extract`. Pages are separated by form feeds,
/// which are turned into blank lines.
pub fn layout_text(bytes: &[u8]) -> Option<String> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| debug!("pdf-extract: {e}"))
        .ok()?;
    let text = raw
        .split('\u{000C}')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(text)
}

/// Text via an already-available pdfium library.
pub fn pdfium_text(bytes: &[u8], library: Option<&Path>) -> Option<String> {
    let pdfium = bind_existing(library)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| debug!("pdfium: load failed: {e:?}"))
        .ok()?;
    let text = document
        .pages()
        .iter()
        .filter_map(|page| page.text().ok().map(|t| t.all()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(text)
}

/// Bind pdfium without triggering a download.
fn bind_existing(library: Option<&Path>) -> Option<Pdfium> {
    let candidate: Option<PathBuf> = library
        .map(Path::to_path_buf)
        .or_else(pdfium_auto::cached_pdfium_path);
    if let Some(path) = candidate {
        match pdfium_auto::bind_pdfium_from_path(&path) {
            Ok(p) => return Some(p),
            Err(e) => debug!("pdfium: bind to {} failed: {e}", path.display()),
        }
    }
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| debug!("pdfium: no system library: {e:?}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::run_chain;

    #[test]
    fn every_stage_rejects_non_pdf_without_panicking() {
        let junk = b"%PDF-1.4\nthis header lies";
        assert!(std::panic::catch_unwind(|| lopdf_text(junk)).is_ok());
        assert!(run_chain(&strategies(&ExtractionConfig::default()), junk).is_none());
    }

    #[test]
    fn chain_order_is_lopdf_layout_pdfium() {
        let names: Vec<_> = strategies(&ExtractionConfig::default())
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["lopdf", "pdf-extract", "pdfium"]);
    }

    #[test]
    fn missing_configured_library_falls_through_quietly() {
        let r = pdfium_text(b"%PDF-1.4", Some(Path::new("/no/such/libpdfium.so")));
        assert!(r.map(|t| t.is_empty()).unwrap_or(true));
    }
}
