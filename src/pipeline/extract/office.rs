//! DOCX and ODT: ZIP containers holding one XML body each.
//!
//! Both are read with a streaming `quick-xml` pass over the body member.
//! Element names are matched on their local part, so the `w:` and `text:`
//! prefixes (or whatever a producer chose to bind) don't matter.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

/// Body member of a DOCX package.
const DOCX_BODY: &str = "word/document.xml";
/// Body member of an ODF text document.
const ODT_BODY: &str = "content.xml";

/// Paragraph texts of a DOCX document, in order, blank ones dropped,
/// joined by a blank line.
pub fn docx_text(bytes: &[u8]) -> Option<String> {
    let xml = read_member(bytes, DOCX_BODY)?;
    collect_paragraphs(&xml, &Dialect::DOCX)
}

/// Paragraph and heading texts of an ODT document, in document order,
/// including text nested in spans, links and list items.
pub fn odt_text(bytes: &[u8]) -> Option<String> {
    let xml = read_member(bytes, ODT_BODY)?;
    collect_paragraphs(&xml, &Dialect::ODT)
}

fn read_member(bytes: &[u8], name: &str) -> Option<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| debug!("zip: {e}"))
        .ok()?;
    let mut member = archive
        .by_name(name)
        .map_err(|e| debug!("zip: no {name}: {e}"))
        .ok()?;
    let mut xml = String::new();
    member
        .read_to_string(&mut xml)
        .map_err(|e| debug!("zip: reading {name}: {e}"))
        .ok()?;
    Some(xml)
}

/// Which local element names mean what in a given format.
struct Dialect {
    /// Elements that start a paragraph.
    blocks: &'static [&'static [u8]],
    /// Elements whose text content is document text. Empty means any text
    /// inside a block counts.
    text_runs: &'static [&'static [u8]],
    tabs: &'static [&'static [u8]],
    breaks: &'static [&'static [u8]],
    /// Empty elements standing for a space.
    spaces: &'static [&'static [u8]],
}

impl Dialect {
    const DOCX: Dialect = Dialect {
        blocks: &[b"p"],
        text_runs: &[b"t"],
        tabs: &[b"tab"],
        breaks: &[b"br", b"cr"],
        spaces: &[],
    };

    const ODT: Dialect = Dialect {
        blocks: &[b"p", b"h"],
        text_runs: &[],
        tabs: &[b"tab"],
        breaks: &[b"line-break"],
        spaces: &[b"s"],
    };
}

fn collect_paragraphs(xml: &str, dialect: &Dialect) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut block_depth = 0usize;
    let mut run_depth = 0usize;

    let in_text = |block_depth: usize, run_depth: usize| {
        block_depth > 0 && (dialect.text_runs.is_empty() || run_depth > 0)
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if dialect.blocks.contains(&name) {
                    block_depth += 1;
                } else if dialect.text_runs.contains(&name) {
                    run_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if dialect.blocks.contains(&name) {
                    block_depth = block_depth.saturating_sub(1);
                    if block_depth == 0 {
                        let text = current.trim();
                        if !text.is_empty() {
                            paragraphs.push(text.to_string());
                        }
                        current.clear();
                    }
                } else if dialect.text_runs.contains(&name) {
                    run_depth = run_depth.saturating_sub(1);
                }
            }
            Ok(Event::Empty(e)) if block_depth > 0 => {
                let name = e.local_name();
                let name = name.as_ref();
                if dialect.tabs.contains(&name) {
                    current.push('\t');
                } else if dialect.breaks.contains(&name) {
                    current.push('\n');
                } else if dialect.spaces.contains(&name) {
                    let n = e
                        .try_get_attribute("text:c")
                        .ok()
                        .flatten()
                        .and_then(|a| std::str::from_utf8(&a.value).ok()?.parse::<usize>().ok())
                        .unwrap_or(1);
                    current.extend(std::iter::repeat(' ').take(n.min(1024)));
                }
            }
            Ok(Event::Text(t)) if in_text(block_depth, run_depth) => match t.unescape() {
                Ok(s) => current.push_str(&s),
                Err(e) => debug!("xml: bad text escape: {e}"),
            },
            Ok(Event::CData(c)) if in_text(block_depth, run_depth) => {
                current.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("xml: parse error at {}: {e}", reader.buffer_position());
                break;
            }
        }
    }

    // A truncated body still yields whatever paragraphs were closed.
    let tail = current.trim();
    if !tail.is_empty() {
        paragraphs.push(tail.to_string());
    }
    Some(paragraphs.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(member: &str, xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut buf);
            w.start_file(member, zip::write::SimpleFileOptions::default())
                .unwrap();
            w.write_all(xml.as_bytes()).unwrap();
            w.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn docx_paragraphs_in_order() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Newton's </w:t></w:r><w:r><w:t>laws</w:t></w:r></w:p>
    <w:p><w:r><w:t>   </w:t></w:r></w:p>
    <w:p><w:r><w:t>F</w:t><w:tab/><w:t>=</w:t><w:br/><w:t>ma &amp; more</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let text = docx_text(&zip_with(DOCX_BODY, xml)).unwrap();
        assert_eq!(text, "Newton's laws\n\nF\t=\nma & more");
    }

    #[test]
    fn docx_ignores_text_outside_runs() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:pPr>style</w:pPr><w:r><w:t>kept</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(docx_text(&zip_with(DOCX_BODY, xml)).unwrap(), "kept");
    }

    #[test]
    fn odt_headings_and_nested_spans_in_document_order() {
        let xml = r#"<office:document-content xmlns:office="o" xmlns:text="t">
<office:body><office:text>
  <text:h text:outline-level="1">Kinematics</text:h>
  <text:p>v = u <text:span>+ at</text:span></text:p>
  <text:list><text:list-item><text:p>s<text:s text:c="2"/>= ut</text:p></text:list-item></text:list>
</office:text></office:body></office:document-content>"#;
        let text = odt_text(&zip_with(ODT_BODY, xml)).unwrap();
        assert_eq!(text, "Kinematics\n\nv = u + at\n\ns  = ut");
    }

    #[test]
    fn missing_member_is_none() {
        assert!(docx_text(&zip_with("other.xml", "<a/>")).is_none());
        assert!(odt_text(b"not a zip").is_none());
    }
}
