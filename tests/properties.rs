//! Property tests for the sanitizer, the response repair parser and source
//! truncation.

use coursemind::assemble::truncate_source;
use coursemind::{sanitize, RepairConfig, ResponseRepairParser};
use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

fn is_forbidden(c: char) -> bool {
    matches!(c, '\0'..='\x08' | '\x0B' | '\x0C' | '\x0E'..='\x1F' | '\x7F')
}

fn render_object(counts: &BTreeMap<String, u32>, summary: &str) -> String {
    let mut out = String::from("{");
    for (k, v) in counts {
        out.push_str(&format!("\"{k}\": {v}, "));
    }
    out.push_str(&format!("\"summary\": \"{summary}\"}}"));
    out
}

proptest! {
    #[test]
    fn sanitize_is_total_and_clean(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let out = sanitize(&bytes);
        prop_assert!(!out.chars().any(is_forbidden));
    }

    #[test]
    fn sanitize_is_idempotent(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let once = sanitize(&bytes);
        prop_assert_eq!(sanitize(&once), once.clone());
    }

    #[test]
    fn sanitize_keeps_ordinary_text(text in "[a-zA-Z0-9 .,\n\t\r]{0,200}") {
        prop_assert_eq!(sanitize(&text), text);
    }

    #[test]
    fn fenced_object_with_raw_newlines_round_trips(
        counts in prop::collection::btree_map("t_[a-z]{1,8}", 0u32..1000, 0..6),
        summary in "[a-zA-Z0-9 \n\t]{0,40}",
    ) {
        let raw = format!("```json\n{}\n```", render_object(&counts, &summary));
        let parsed = ResponseRepairParser::new(&RepairConfig::default()).parse(&raw).unwrap();
        for (k, v) in &counts {
            prop_assert_eq!(parsed.get(k).and_then(Value::as_u64), Some(u64::from(*v)));
        }
        prop_assert_eq!(parsed.get("summary").and_then(Value::as_str), Some(summary.as_str()));
    }

    #[test]
    fn cut_inside_final_string_keeps_every_earlier_key(
        counts in prop::collection::btree_map("t_[a-z]{1,8}", 0u32..1000, 1..6),
        summary in "[a-zA-Z0-9 ]{1,40}",
        keep in 0usize..40,
    ) {
        let full = render_object(&counts, &summary);
        let open = full.rfind("\"summary\": \"").unwrap() + "\"summary\": \"".len();
        let cut = open + keep.min(summary.len());
        let parsed = ResponseRepairParser::new(&RepairConfig::default())
            .parse(&full[..cut])
            .unwrap();
        for (k, v) in &counts {
            prop_assert_eq!(parsed.get(k).and_then(Value::as_u64), Some(u64::from(*v)));
        }
        let recovered = parsed.get("summary").and_then(Value::as_str).unwrap_or_default();
        prop_assert!(summary.starts_with(recovered));
    }

    #[test]
    fn truncation_never_exceeds_cap(text in "[a-z\n]{0,400}", cap in 1usize..200) {
        let out = truncate_source(&text, cap);
        if text.chars().count() <= cap {
            prop_assert_eq!(out, text);
        } else {
            let body = out.split("\n\n*[Source truncated").next().unwrap_or_default();
            prop_assert!(body.chars().count() <= cap);
            prop_assert!(text.starts_with(body));
        }
    }
}
