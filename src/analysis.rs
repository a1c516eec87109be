//! Correlation of past-test content against handouts and notes.
//!
//! One call correlates one analysis block: a past-test group and a reference
//! group. Preconditions are checked before any prompt is built, in a fixed
//! order, each with its own [`CoreError`] variant so the host can tell the
//! user exactly what to add or re-upload.

use crate::config::CoreConfig;
use crate::document::SourceDocument;
use crate::error::{CoreError, CoreResult};
use crate::material::{Material, MaterialGroup, MaterialKind};
use crate::output::CorrelationResult;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::ModelCaller;
use crate::pipeline::repair::ResponseRepairParser;
use crate::pipeline::sanitize::sanitize;
use crate::prompts;
use tracing::{info, warn};

/// Builds correlation prompts and parses the model's answer.
#[derive(Debug, Clone)]
pub struct CorrelationAnalyzer {
    chars_per_file: usize,
    parser: ResponseRepairParser,
}

impl CorrelationAnalyzer {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            chars_per_file: config.analysis_chars_per_file,
            parser: ResponseRepairParser::new(&config.repair),
        }
    }

    /// Correlate `past_tests` against `references` via `caller`.
    ///
    /// Fails before calling the model when a side is missing or when every
    /// member of a side is unreadable. A side with at least one readable
    /// member is enough to proceed.
    pub fn analyze<C: ModelCaller + ?Sized>(
        &self,
        past_tests: &MaterialGroup,
        references: &MaterialGroup,
        caller: &C,
    ) -> CoreResult<CorrelationResult> {
        check_preconditions(past_tests, references)?;
        info!(
            "Correlating {} past test(s) against {} reference file(s)",
            past_tests.members.len(),
            references.members.len()
        );

        let prompt = self.build_prompt(past_tests, references);
        let raw = caller.generate(prompts::ANALYSIS_SYSTEM_PROMPT, &prompt)?;
        if raw.trim().is_empty() {
            return Err(CoreError::MalformedResponse {
                detail: "the model returned an empty response".into(),
            });
        }

        let object = self.parser.parse(&raw)?;
        let result = CorrelationResult::from_json(&object);
        info!(
            "Correlation complete: {} topic(s), {} high-signal file(s)",
            result.topic_frequency.len(),
            result.high_signal_handouts.len()
        );
        Ok(result)
    }

    /// Extract both sides, then [`Self::analyze`].
    pub fn analyze_documents<C: ModelCaller + ?Sized>(
        &self,
        extractor: &TextExtractor,
        past_tests: &[SourceDocument],
        references: &[SourceDocument],
        caller: &C,
    ) -> CoreResult<CorrelationResult> {
        let past = extract_group(extractor, MaterialKind::PastTest, past_tests);
        let refs = extract_group(extractor, MaterialKind::Handout, references);
        self.analyze(&past, &refs, caller)
    }

    /// The user prompt for one block: reference files, then test files, then
    /// the JSON contract. Each section is sanitized as a whole.
    pub fn build_prompt(&self, past_tests: &MaterialGroup, references: &MaterialGroup) -> String {
        let reference_section = sanitize(&self.section(references));
        let test_section = sanitize(&self.section(past_tests));
        format!(
            "{}{}{}{}{}",
            prompts::ANALYSIS_REFERENCE_HEADING,
            reference_section,
            prompts::ANALYSIS_TEST_HEADING,
            test_section,
            prompts::ANALYSIS_CONTRACT
        )
    }

    fn section(&self, group: &MaterialGroup) -> String {
        let mut out = String::new();
        for m in &group.members {
            out.push_str("### ");
            out.push_str(&sanitize(&m.label));
            out.push('\n');
            match m.usable_text() {
                Some(text) => out.push_str(&cap_chars(text, self.chars_per_file)),
                None => out.push_str(prompts::ANALYSIS_NO_TEXT),
            }
            out.push_str("\n\n");
        }
        out
    }
}

/// Validate a block before any prompt is built.
pub fn check_preconditions(past_tests: &MaterialGroup, references: &MaterialGroup) -> CoreResult<()> {
    match (past_tests.is_empty(), references.is_empty()) {
        (true, true) => return Err(CoreError::EmptyBlock),
        (true, false) => return Err(CoreError::MissingPastTest),
        (false, true) => return Err(CoreError::MissingReferenceMaterial),
        (false, false) => {}
    }

    let dead_tests = if past_tests.has_usable_text() {
        Vec::new()
    } else {
        past_tests.unusable_labels()
    };
    let dead_refs = if references.has_usable_text() {
        Vec::new()
    } else {
        references.unusable_labels()
    };
    if !dead_tests.is_empty() || !dead_refs.is_empty() {
        return Err(CoreError::NoUsableContent {
            past_tests: dead_tests,
            references: dead_refs,
        });
    }

    for group in [past_tests, references] {
        let skipped = group.unusable_labels();
        if !skipped.is_empty() {
            warn!(
                "Proceeding without unreadable {} file(s): {}",
                group.kind,
                skipped.join(", ")
            );
        }
    }
    Ok(())
}

fn extract_group(
    extractor: &TextExtractor,
    kind: MaterialKind,
    docs: &[SourceDocument],
) -> MaterialGroup {
    let members = docs
        .iter()
        .map(|d| Material::from_extraction(d.label.clone(), extractor.extract(d)))
        .collect();
    MaterialGroup::new(kind, members)
}

/// First `cap` characters of `text`, with a marker when anything was cut.
fn cap_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((byte, _)) => format!("{}{}", &text[..byte], prompts::ANALYSIS_TRUNCATED_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionFailure;

    fn group(kind: MaterialKind, members: Vec<Material>) -> MaterialGroup {
        MaterialGroup::new(kind, members)
    }

    fn unreadable(label: &str) -> Material {
        Material::failed(
            label,
            ExtractionFailure::NoExtractableText {
                label: label.into(),
                format: "pdf".into(),
            },
        )
    }

    fn never_called(_: &str, _: &str) -> CoreResult<String> {
        panic!("model must not be called")
    }

    #[test]
    fn precondition_order() {
        let a = CorrelationAnalyzer::new(&CoreConfig::default());
        let empty_t = group(MaterialKind::PastTest, vec![]);
        let empty_h = group(MaterialKind::Handout, vec![]);
        let t = group(MaterialKind::PastTest, vec![Material::text("t.txt", "Q1")]);
        let h = group(MaterialKind::Handout, vec![Material::text("h.txt", "F=ma")]);

        assert!(matches!(a.analyze(&empty_t, &empty_h, &never_called), Err(CoreError::EmptyBlock)));
        assert!(matches!(a.analyze(&empty_t, &h, &never_called), Err(CoreError::MissingPastTest)));
        assert!(matches!(
            a.analyze(&t, &empty_h, &never_called),
            Err(CoreError::MissingReferenceMaterial)
        ));
    }

    #[test]
    fn both_sides_unreadable_names_both_files() {
        let a = CorrelationAnalyzer::new(&CoreConfig::default());
        let t = group(MaterialKind::PastTest, vec![unreadable("midterm.pdf")]);
        let h = group(MaterialKind::Handout, vec![unreadable("week1.pdf")]);
        match a.analyze(&t, &h, &never_called) {
            Err(CoreError::NoUsableContent { past_tests, references }) => {
                assert_eq!(past_tests, vec!["midterm.pdf"]);
                assert_eq!(references, vec!["week1.pdf"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn partial_side_is_enough() {
        let t = group(MaterialKind::PastTest, vec![Material::text("t.txt", "Q1")]);
        let h = group(
            MaterialKind::Handout,
            vec![unreadable("scan.pdf"), Material::text("h.txt", "F=ma")],
        );
        assert!(check_preconditions(&t, &h).is_ok());
    }

    #[test]
    fn prompt_layout_and_placeholders() {
        let a = CorrelationAnalyzer::new(&CoreConfig::default());
        let t = group(MaterialKind::PastTest, vec![Material::text("exam.txt", "Explain F=ma")]);
        let h = group(
            MaterialKind::Note,
            vec![Material::text("n.txt", "Newton\0 laws"), unreadable("scan.pdf")],
        );
        let p = a.build_prompt(&t, &h);
        let refs = p.find("## Handout/Note Materials").unwrap();
        let tests = p.find("## Test Questions").unwrap();
        assert!(refs < tests);
        assert!(p.contains("### n.txt\nNewton laws\n\n"));
        assert!(p.contains("### scan.pdf\n(no text extracted)\n\n"));
        assert!(p.contains("### exam.txt\nExplain F=ma\n\n"));
        assert!(p.ends_with('}'));
    }

    #[test]
    fn section_labels_are_sanitized() {
        let a = CorrelationAnalyzer::new(&CoreConfig::default());
        let h = group(MaterialKind::Handout, vec![Material::text("wk\x071\0.txt", "F=ma")]);
        assert_eq!(a.section(&h), "### wk 1.txt\nF=ma\n\n");
    }

    #[test]
    fn long_files_are_capped_with_marker() {
        let cfg = CoreConfig::builder().analysis_chars_per_file(5).build().unwrap();
        let a = CorrelationAnalyzer::new(&cfg);
        let t = group(MaterialKind::PastTest, vec![Material::text("t", "ééééééé")]);
        let h = group(MaterialKind::Handout, vec![Material::text("h", "abc")]);
        let p = a.build_prompt(&t, &h);
        assert!(p.contains("### t\nééééé\n\n*[truncated]*"));
        assert!(p.contains("### h\nabc\n\n"));
    }

    #[test]
    fn parses_fenced_model_answer() {
        let a = CorrelationAnalyzer::new(&CoreConfig::default());
        let t = group(MaterialKind::PastTest, vec![Material::text("t", "Q")]);
        let h = group(MaterialKind::Handout, vec![Material::text("h", "A")]);
        let caller = |_: &str, _: &str| -> CoreResult<String> {
            Ok("```json\n{\"topic_frequency\": {\"forces\": \"2\"}, \"summary\": \"s\"}\n```".into())
        };
        let r = a.analyze(&t, &h, &caller).unwrap();
        assert_eq!(r.topic_frequency["forces"], 2);
    }

    #[test]
    fn blank_answer_is_malformed() {
        let a = CorrelationAnalyzer::new(&CoreConfig::default());
        let t = group(MaterialKind::PastTest, vec![Material::text("t", "Q")]);
        let h = group(MaterialKind::Handout, vec![Material::text("h", "A")]);
        let caller = |_: &str, _: &str| -> CoreResult<String> { Ok("  ".into()) };
        assert!(matches!(
            a.analyze(&t, &h, &caller),
            Err(CoreError::MalformedResponse { .. })
        ));
    }
}
