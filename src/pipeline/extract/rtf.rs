//! RTF: decode, then strip control words with `rtf-parser`.
//!
//! RTF bodies are nominally 7-bit, but editors routinely write raw 8-bit
//! bytes in the document's codepage. Decoding is tried as strict UTF-8, then
//! Windows-1252, then Latin-1, stopping at the first decoding that parses.

use super::Strategy;
use encoding_rs::WINDOWS_1252;
use rtf_parser::RtfDocument;
use tracing::debug;

pub fn strategies() -> Vec<Strategy<'static>> {
    vec![
        Strategy::new("rtf/utf-8", |b| decode_utf8(b).and_then(|s| rtf_to_text(&s))),
        Strategy::new("rtf/windows-1252", |b| rtf_to_text(&decode_windows_1252(b))),
        Strategy::new("rtf/latin-1", |b| rtf_to_text(&decode_latin1(b))),
    ]
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

fn decode_windows_1252(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Plain text of an RTF document, or `None` if `source` isn't RTF or won't parse.
pub fn rtf_to_text(source: &str) -> Option<String> {
    let body = source.trim_start_matches('\u{FEFF}').trim_start();
    if !body.starts_with("{\\rtf") {
        return None;
    }
    match RtfDocument::try_from(body) {
        Ok(doc) => Some(doc.get_text().trim().to_string()),
        Err(e) => {
            debug!("rtf-parser: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::run_chain;

    #[test]
    fn plain_rtf_text() {
        let src = r"{\rtf1\ansi\deff0 {\fonttbl {\f0 Times;}}\f0 Newton's first law}";
        let text = run_chain(&strategies(), src.as_bytes()).unwrap();
        assert!(text.contains("Newton's first law"), "got: {text:?}");
    }

    #[test]
    fn non_rtf_is_rejected() {
        assert!(rtf_to_text("just words").is_none());
        assert!(run_chain(&strategies(), b"\x00\x01 nope").is_none());
    }

    #[test]
    fn eight_bit_bytes_fall_through_to_codepage() {
        // 0xE9 is 'é' in Windows-1252 and not valid UTF-8 on its own.
        let src = b"{\\rtf1\\ansi caf\xE9}";
        assert!(decode_utf8(src).is_none());
        assert!(decode_windows_1252(src).contains("café"));
        assert!(run_chain(&strategies(), src).is_some());
    }
}
