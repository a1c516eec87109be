//! HTML and plain text.

use scraper::{Html, Node};

/// Elements whose descendant text is never document text.
const SKIPPED: [&str; 4] = ["script", "style", "noscript", "template"];

/// Text nodes of an HTML document, each trimmed, blank ones dropped,
/// joined by a blank line. Script and style bodies are not text.
pub fn html_text(bytes: &[u8]) -> Option<String> {
    let source = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&source);

    let parts: Vec<&str> = document
        .tree
        .nodes()
        .filter_map(|node| match node.value() {
            Node::Text(t) => Some((node, t)),
            _ => None,
        })
        .filter(|(node, _)| {
            !node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED.contains(&e.name()))
            })
        })
        .map(|(_, t)| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    Some(parts.join("\n\n"))
}

/// UTF-8 with lossy replacement of invalid sequences.
pub fn plain_text(bytes: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_collects_text_nodes() {
        let html = br#"<!doctype html><html><head><title>Week 1</title>
<style>p { color: red }</style><script>var x = "hidden";</script></head>
<body><h1>Kinematics</h1><p>Velocity is <b>rate</b> of change.</p></body></html>"#;
        assert_eq!(
            html_text(html).unwrap(),
            "Week 1\n\nKinematics\n\nVelocity is\n\nrate\n\nof change."
        );
    }

    #[test]
    fn html_without_text_is_blank() {
        assert_eq!(html_text(b"<div><br/></div>").unwrap(), "");
    }

    #[test]
    fn plain_text_replaces_invalid_utf8() {
        assert_eq!(plain_text(b"ok\xFFok").unwrap(), "ok\u{FFFD}ok");
    }
}
