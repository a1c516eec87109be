//! Text sanitation before anything is sent to a model API.
//!
//! Model endpoints reject requests carrying NUL bytes and some control
//! characters with an opaque 400. Rust strings cannot hold lone surrogates,
//! so the lossy UTF-8 decode on the way in is what removes them: any invalid
//! sequence (including an encoded surrogate half) becomes U+FFFD.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x01-\x08\x0B\x0C\x0E-\x1F\x7F]").unwrap());

/// Make text safe to send: valid UTF-8, no NUL, and every control character
/// other than tab, newline and carriage return replaced by a space.
///
/// Total and idempotent. Accepts `&str`, `String`, `&[u8]`, `Vec<u8>`.
pub fn sanitize<T: AsRef<[u8]> + ?Sized>(input: &T) -> String {
    let text = String::from_utf8_lossy(input.as_ref());
    let text = if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text.into_owned()
    };
    RE_CONTROL.replace_all(&text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nul_and_blanks_controls() {
        assert_eq!(sanitize("a\0b\x07c\x1Fd\x7F"), "ab c d ");
    }

    #[test]
    fn keeps_tab_newline_cr() {
        assert_eq!(sanitize("a\tb\nc\r\n"), "a\tb\nc\r\n");
    }

    #[test]
    fn invalid_utf8_and_surrogates_are_replaced() {
        // 0xED 0xA0 0x80 is the UTF-8 encoding of the lone surrogate U+D800.
        let out = sanitize(&b"ok \xED\xA0\x80 \xFF end"[..]);
        assert!(out.starts_with("ok "));
        assert!(out.ends_with(" end"));
        assert!(out.contains('\u{FFFD}'));
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn idempotent_on_mixed_input() {
        let once = sanitize(&b"\x00\x01x\x0b\xc3\x28y\x0c"[..]);
        assert_eq!(sanitize(&once), once);
    }
}
