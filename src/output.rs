//! Structured results handed back to the caller.
//!
//! [`CorrelationResult`] is the one JSON-shaped object this crate consumes
//! from a model. Its field names are fixed:
//! `topic_frequency`, `conversion_patterns`, `question_formats`,
//! `high_signal_handouts`, `summary`. Models are sloppy about numbers, so
//! [`CorrelationResult::from_json`] reads counts leniently instead of going
//! through a strict `Deserialize`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ── Correlation ──────────────────────────────────────────────────────────────

/// How handout content was turned into exam questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPatterns {
    pub verbatim: u32,
    pub conceptually_transformed: u32,
    pub applied_to_new_scenario: u32,
}

/// Question-format counts.
///
/// The four standard formats are fields; anything else the model reports is
/// kept in `extra` so it still contributes to an author's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFormats {
    pub multiple_choice: u32,
    pub free_response: u32,
    pub problem_solving: u32,
    pub short_answer: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, u32>,
}

impl QuestionFormats {
    /// `(name, count)` pairs: standard formats first, then extras alphabetically.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        [
            ("multiple_choice", self.multiple_choice),
            ("free_response", self.free_response),
            ("problem_solving", self.problem_solving),
            ("short_answer", self.short_answer),
        ]
        .into_iter()
        .chain(self.extra.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    pub fn add(&mut self, name: &str, n: u32) {
        let slot = match name {
            "multiple_choice" => &mut self.multiple_choice,
            "free_response" => &mut self.free_response,
            "problem_solving" => &mut self.problem_solving,
            "short_answer" => &mut self.short_answer,
            other => self.extra.entry(other.to_string()).or_insert(0),
        };
        *slot = slot.saturating_add(n);
    }

    pub fn merge(&mut self, other: &QuestionFormats) {
        for (name, n) in other.iter() {
            self.add(name, n);
        }
    }

    pub fn total(&self) -> u32 {
        self.iter().fold(0u32, |acc, (_, n)| acc.saturating_add(n))
    }
}

/// A source file the model singled out as predictive of exam content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSignalFile {
    pub file_name: String,
    pub topic_coverage: String,
    pub question_count: u32,
}

/// The outcome of correlating one past-test group against one reference group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Topic → number of questions on it. Ordered by topic name.
    pub topic_frequency: BTreeMap<String, u32>,
    pub conversion_patterns: ConversionPatterns,
    pub question_formats: QuestionFormats,
    /// In the order the model ranked them.
    pub high_signal_handouts: Vec<HighSignalFile>,
    pub summary: String,
}

impl CorrelationResult {
    /// Build a result from a repaired JSON object, tolerating missing or
    /// oddly typed fields.
    pub fn from_json(obj: &Map<String, Value>) -> Self {
        let mut topic_frequency = BTreeMap::new();
        if let Some(m) = obj.get("topic_frequency").and_then(Value::as_object) {
            // Keys differing only by surrounding whitespace are one topic.
            for (k, v) in m {
                let topic = k.trim();
                if topic.is_empty() {
                    continue;
                }
                let slot: &mut u32 = topic_frequency.entry(topic.to_string()).or_insert(0);
                *slot = slot.saturating_add(lenient_count(v));
            }
        }

        let conversion_patterns = obj
            .get("conversion_patterns")
            .and_then(Value::as_object)
            .map(|m| ConversionPatterns {
                verbatim: count_field(m, "verbatim"),
                conceptually_transformed: count_field(m, "conceptually_transformed"),
                applied_to_new_scenario: count_field(m, "applied_to_new_scenario"),
            })
            .unwrap_or_default();

        let mut question_formats = QuestionFormats::default();
        if let Some(m) = obj.get("question_formats").and_then(Value::as_object) {
            for (k, v) in m {
                question_formats.add(k, lenient_count(v));
            }
        }

        let high_signal_handouts = obj
            .get("high_signal_handouts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|h| HighSignalFile {
                        file_name: string_field(h, "file_name"),
                        topic_coverage: string_field(h, "topic_coverage"),
                        question_count: count_field(h, "question_count"),
                    })
                    .filter(|h| !h.file_name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic_frequency,
            conversion_patterns,
            question_formats,
            high_signal_handouts,
            summary: string_field(obj, "summary"),
        }
    }

    /// Topics the model listed but counted zero questions for.
    pub fn untested_topics(&self) -> impl Iterator<Item = &str> {
        self.topic_frequency
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(t, _)| t.as_str())
    }
}

/// Read a count from whatever the model put there: integer, float
/// (truncated), or numeric string. Anything else is zero.
pub(crate) fn lenient_count(v: &Value) -> u32 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f > 0.0).map(|f| f as u32))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn count_field(m: &Map<String, Value>, key: &str) -> u32 {
    m.get(key).map(lenient_count).unwrap_or(0)
}

fn string_field(m: &Map<String, Value>, key: &str) -> String {
    match m.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ── Author ───────────────────────────────────────────────────────────────────

/// One topic in an [`AuthorProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestedTopic {
    pub topic: String,
    /// Summed across every correlation result for the author.
    pub frequency: u32,
    /// `n / (n + 2)` for `n` analyzed pairs, identical for every topic.
    pub confidence: f64,
}

/// Aggregate of every correlation result attributed to one author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    /// Descending by frequency.
    pub tested_topics: Vec<TestedTopic>,
    pub preferred_formats: QuestionFormats,
    pub pairs_analyzed: usize,
}

impl AuthorProfile {
    pub fn is_empty(&self) -> bool {
        self.tested_topics.is_empty() && self.preferred_formats.total() == 0
    }
}

/// A free-form question/answer pair a student filled in about an author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// What the host knows about the author of the materials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    #[serde(default)]
    pub specialties: Option<String>,
    /// Teaching style and emphasis.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quiz_qa: Vec<QaPair>,
}

impl AuthorInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// ── Generation ───────────────────────────────────────────────────────────────

/// Labeled header fields rendered at the top of a user prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContext {
    pub fields: Vec<(String, String)>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Blank values are skipped.
    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.push((label.into(), value.trim().to_string()));
        }
        self
    }
}

/// How a guide request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideStatus {
    Generated,
    /// No material had usable text; the model was not called.
    NoUsableContent,
    /// The model answered with blank text.
    EmptyResponse,
}

/// A generated study guide, or the user-facing reason there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideOutput {
    pub content: String,
    pub status: GuideStatus,
}

/// One survey question for tailoring material to an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn topics_equal_after_trim_are_summed() {
        let r = CorrelationResult::from_json(&obj(json!({
            "topic_frequency": {"Forces": 2, "Forces ": 3, " Energy": 1, "  ": 9}
        })));
        assert_eq!(r.topic_frequency.len(), 2);
        assert_eq!(r.topic_frequency["Forces"], 5);
        assert_eq!(r.topic_frequency["Energy"], 1);

        let r = CorrelationResult::from_json(&obj(json!({
            "topic_frequency": {"Forces": u32::MAX, " Forces": 4}
        })));
        assert_eq!(r.topic_frequency["Forces"], u32::MAX);
    }

    #[test]
    fn from_json_reads_full_shape() {
        let r = CorrelationResult::from_json(&obj(json!({
            "topic_frequency": {"Newton's second law": 3, "kinematics": 0},
            "conversion_patterns": {"verbatim": 1, "conceptually_transformed": 2, "applied_to_new_scenario": 0},
            "question_formats": {"multiple_choice": 2, "free_response": 1, "problem_solving": 0, "short_answer": 0},
            "high_signal_handouts": [{"file_name": "newton.txt", "topic_coverage": "forces", "question_count": 3}],
            "summary": "Mostly applied."
        })));
        assert_eq!(r.topic_frequency["Newton's second law"], 3);
        assert_eq!(r.conversion_patterns.conceptually_transformed, 2);
        assert_eq!(r.question_formats.multiple_choice, 2);
        assert_eq!(r.high_signal_handouts[0].file_name, "newton.txt");
        assert_eq!(r.summary, "Mostly applied.");
        assert_eq!(r.untested_topics().collect::<Vec<_>>(), vec!["kinematics"]);
    }

    #[test]
    fn counts_are_lenient() {
        assert_eq!(lenient_count(&json!(4)), 4);
        assert_eq!(lenient_count(&json!(2.9)), 2);
        assert_eq!(lenient_count(&json!("5")), 5);
        assert_eq!(lenient_count(&json!(" 1.5 ")), 1);
        assert_eq!(lenient_count(&json!(-3)), 0);
        assert_eq!(lenient_count(&json!(null)), 0);
        assert_eq!(lenient_count(&json!("many")), 0);
    }

    #[test]
    fn missing_fields_default() {
        let r = CorrelationResult::from_json(&Map::new());
        assert!(r.topic_frequency.is_empty());
        assert_eq!(r.question_formats.total(), 0);
        assert!(r.high_signal_handouts.is_empty());
        assert_eq!(r.summary, "");
    }

    #[test]
    fn unknown_formats_kept_as_extra() {
        let r = CorrelationResult::from_json(&obj(json!({
            "question_formats": {"true_false": 2, "short_answer": 1}
        })));
        assert_eq!(r.question_formats.extra["true_false"], 2);
        assert_eq!(r.question_formats.total(), 3);
    }

    #[test]
    fn context_skips_blank_fields() {
        let c = PromptContext::new().field("Course", "PHYS 101").field("Professor", "  ");
        assert_eq!(c.fields, vec![("Course".to_string(), "PHYS 101".to_string())]);
    }
}
