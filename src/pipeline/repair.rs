//! Recover JSON from model responses that strict parsing rejects.
//!
//! ## Failure modes handled
//!
//! - The whole response wrapped in a markdown code fence despite the prompt.
//! - Literal newlines, carriage returns and tabs inside string values.
//! - Output cut off by the token limit, usually mid-string.
//!
//! ## Order
//!
//! 1. Strip an outer fence (an unterminated opening fence is stripped too,
//!    since a truncated response never gets its closing one).
//! 2. Strict parse.
//! 3. Escape raw control characters that sit inside string literals.
//! 4. Append each configured closing suffix at the failure offset.
//! 5. Walk backward from the failure offset, at most `salvage_window`
//!    characters. At each cut point whose tail looks like the inside of an
//!    unterminated string (no further unescaped quote, or starting with a
//!    quote), close the string, drop a dangling `,` or `:`, close every open
//!    bracket, and parse. First success wins.
//! 6. Give up with [`CoreError::MalformedResponse`] carrying the error from
//!    step 2.
//!
//! Everything here is heuristic and isolated behind [`ResponseRepairParser::parse`]
//! so a stricter policy can replace it without touching callers.

use crate::config::RepairConfig;
use crate::error::{CoreError, CoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static RE_OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+\-]*\s*").unwrap());

static RE_CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?[ \t]*```\s*$").unwrap());

/// What the caller needs at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Any,
}

impl Shape {
    fn accepts(self, v: &Value) -> bool {
        match self {
            Shape::Object => v.is_object(),
            Shape::Any => true,
        }
    }
}

/// Recovers structured JSON from raw model text.
#[derive(Debug, Clone, Default)]
pub struct ResponseRepairParser {
    config: RepairConfig,
}

impl ResponseRepairParser {
    pub fn new(config: &RepairConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Recover a top-level JSON object.
    pub fn parse(&self, raw: &str) -> CoreResult<Map<String, Value>> {
        match self.recover(raw, Shape::Object)? {
            Value::Object(m) => Ok(m),
            other => Err(CoreError::MalformedResponse {
                detail: format!("expected a JSON object, got {}", kind_of(&other)),
            }),
        }
    }

    /// Recover any JSON value (arrays included).
    pub fn parse_value(&self, raw: &str) -> CoreResult<Value> {
        self.recover(raw, Shape::Any)
    }

    fn recover(&self, raw: &str, shape: Shape) -> CoreResult<Value> {
        let text = strip_fence(raw);

        let original = match serde_json::from_str::<Value>(text) {
            Ok(v) if shape.accepts(&v) => return Ok(v),
            Ok(v) => format!("expected a JSON object, got {}", kind_of(&v)),
            Err(e) => e.to_string(),
        };
        debug!("Strict parse failed: {original}");

        let escaped = escape_raw_controls(text);
        let offset = match try_parse(&escaped, shape) {
            Ok(v) => {
                warn!("Model JSON needed control-character escaping");
                return Ok(v);
            }
            Err(Some(e)) => error_offset(&escaped, &e),
            Err(None) => escaped.len(),
        };

        let head = &escaped[..offset];
        for suffix in &self.config.closing_suffixes {
            let candidate = format!("{head}{suffix}");
            if let Ok(v) = try_parse(&candidate, shape) {
                warn!("Model JSON was truncated; closed with {:?}", suffix);
                return Ok(v);
            }
        }

        if let Some(v) = salvage(&escaped, offset, self.config.salvage_window, shape) {
            warn!("Model JSON was truncated; salvaged a shortened prefix");
            return Ok(v);
        }

        Err(CoreError::MalformedResponse { detail: original })
    }
}

/// `Err(None)` means the text parsed but had the wrong shape.
fn try_parse(text: &str, shape: Shape) -> Result<Value, Option<serde_json::Error>> {
    match serde_json::from_str::<Value>(text) {
        Ok(v) if shape.accepts(&v) => Ok(v),
        Ok(_) => Err(None),
        Err(e) => Err(Some(e)),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove an outer markdown code fence, if the response starts with one.
pub fn strip_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(open) = RE_OPEN_FENCE.find(text) {
        text = &text[open.end()..];
        if let Some(close) = RE_CLOSE_FENCE.find(text) {
            text = &text[..close.start()];
        }
    }
    text.trim()
}

/// Escape raw control characters that appear inside string literals.
///
/// String state is tracked with backslash awareness, so an escaped quote
/// inside a value does not flip it.
pub fn escape_raw_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

/// Byte offset of a parse failure, clamped to a char boundary.
fn error_offset(text: &str, err: &serde_json::Error) -> usize {
    let line = err.line();
    if line == 0 {
        return text.len();
    }
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    floor_boundary(text, line_start + err.column())
}

fn floor_boundary(text: &str, i: usize) -> usize {
    let mut i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn salvage(text: &str, offset: usize, window: usize, shape: Shape) -> Option<Value> {
    let head = &text[..offset];
    let cuts = std::iter::once(offset).chain(head.char_indices().rev().map(|(i, _)| i));
    for cut in cuts.take(window.saturating_add(1)) {
        if !tail_plausible(&text[cut..]) {
            continue;
        }
        let candidate = close_open_structures(&text[..cut]);
        if let Ok(v) = try_parse(&candidate, shape) {
            debug!("Salvaged at byte {cut} of {}", text.len());
            return Some(v);
        }
    }
    None
}

/// Whether `tail` looks like it continues an unterminated string.
fn tail_plausible(tail: &str) -> bool {
    if tail.starts_with('"') {
        return true;
    }
    let mut escaped = false;
    for c in tail.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return false,
            _ => {}
        }
    }
    true
}

/// Close an open string, drop a dangling separator, and close every open
/// bracket in nesting order.
fn close_open_structures(prefix: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in prefix.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = prefix.to_string();
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    } else {
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        if out.ends_with(',') || out.ends_with(':') {
            out.pop();
        }
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> ResponseRepairParser {
        ResponseRepairParser::default()
    }

    #[test]
    fn strict_json_passes_through() {
        let m = parser().parse(r#"{"summary": "ok", "n": 2}"#).unwrap();
        assert_eq!(m["n"], 2);
    }

    #[test]
    fn fenced_json() {
        let m = parser().parse("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(m["a"], 1);
        let m = parser().parse("  ```\n{\"a\": 2}```  ").unwrap();
        assert_eq!(m["a"], 2);
    }

    #[test]
    fn one_line_fence_is_stripped() {
        let m = parser().parse("```json{\"a\": 1}```").unwrap();
        assert_eq!(m["a"], 1);
        let m = parser().parse("```{\"a\": 2}```").unwrap();
        assert_eq!(m["a"], 2);
        let v = parser().parse_value("```json [1, 2] ```").unwrap();
        assert_eq!(v, json!([1, 2]));
    }

    #[test]
    fn unterminated_fence_is_still_stripped() {
        let m = parser().parse("```json\n{\"summary\": \"cut her").unwrap();
        assert_eq!(m["summary"], "cut her");
    }

    #[test]
    fn raw_newlines_inside_strings() {
        let m = parser()
            .parse("{\"summary\": \"line one\nline two\", \"t\": \"a\tb\"}")
            .unwrap();
        assert_eq!(m["summary"], "line one\nline two");
        assert_eq!(m["t"], "a\tb");
    }

    #[test]
    fn escaped_quote_does_not_confuse_string_tracking() {
        let m = parser()
            .parse("{\"q\": \"say \\\"hi\\\"\nthen\"}")
            .unwrap();
        assert_eq!(m["q"], "say \"hi\"\nthen");
    }

    #[test]
    fn truncated_inside_final_string() {
        let full = r#"{"topic_frequency": {"newton": 2}, "summary": "The professor mostly rewrites handout examples"}"#;
        let cut = full.find("rewrites").unwrap();
        let m = parser().parse(&full[..cut]).unwrap();
        assert_eq!(m["topic_frequency"], json!({"newton": 2}));
        assert_eq!(m["summary"], "The professor mostly ");
    }

    #[test]
    fn truncated_in_nested_array() {
        let raw = r#"{"high_signal_handouts": [{"file_name": "a.pdf", "question_count": 3}, {"file_name": "b.p"#;
        let m = parser().parse(raw).unwrap();
        let list = m["high_signal_handouts"].as_array().unwrap();
        assert_eq!(list[0]["file_name"], "a.pdf");
        assert_eq!(list.last().unwrap()["file_name"], "b.p");
    }

    #[test]
    fn truncated_after_separator() {
        let m = parser().parse(r#"{"a": 1, "b": "x","#).unwrap();
        assert_eq!(m["a"], 1);
        assert_eq!(m["b"], "x");
    }

    #[test]
    fn truncated_after_backslash() {
        let m = parser().parse(r#"{"a": "path\"#).unwrap();
        assert_eq!(m["a"], "path");
    }

    #[test]
    fn hopeless_input_keeps_original_error() {
        let err = parser().parse("I'm sorry, I can't do that.").unwrap_err();
        match err {
            CoreError::MalformedResponse { detail } => assert!(detail.contains("line 1")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_requires_object_but_parse_value_does_not() {
        assert!(parser().parse("[1, 2]").is_err());
        assert_eq!(parser().parse_value("[1, 2]").unwrap(), json!([1, 2]));
        assert_eq!(
            parser().parse_value("[{\"id\": \"q1\"}, {\"id\": \"q").unwrap(),
            json!([{"id": "q1"}, {"id": "q"}])
        );
    }

    #[test]
    fn zero_window_still_tries_failure_offset() {
        let p = ResponseRepairParser::new(&RepairConfig {
            salvage_window: 0,
            closing_suffixes: vec![],
        });
        assert_eq!(p.parse(r#"{"a": "tru"#).unwrap()["a"], "tru");
    }

    #[test]
    fn close_balances_in_nesting_order() {
        assert_eq!(close_open_structures(r#"{"a": [{"b": "c"#), r#"{"a": [{"b": "c"}]}"#);
        assert_eq!(close_open_structures(r#"[1, 2, "#), "[1, 2]");
    }
}
