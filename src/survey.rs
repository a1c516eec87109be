//! Author survey generation.
//!
//! Asks the model for five short questions a student can answer about the
//! author, then normalizes whatever came back to exactly five entries.

use crate::config::RepairConfig;
use crate::error::{CoreError, CoreResult};
use crate::output::{AuthorInfo, SurveyQuestion};
use crate::pipeline::llm::ModelCaller;
use crate::pipeline::repair::ResponseRepairParser;
use crate::prompts;
use serde_json::Value;
use tracing::{info, warn};

/// Number of questions a survey always has.
pub const SURVEY_LEN: usize = 5;

const MAX_QUESTION_CHARS: usize = 500;

/// Generate exactly [`SURVEY_LEN`] questions for `author`.
///
/// Extra items are dropped, missing ones are padded with placeholders, and
/// ids not starting with `q` are replaced by their position (`q1`..`q5`).
pub fn generate_author_survey<C: ModelCaller + ?Sized>(
    author: &AuthorInfo,
    caller: &C,
    repair: &RepairConfig,
) -> CoreResult<Vec<SurveyQuestion>> {
    let prompt = survey_prompt(author);
    let raw = caller.generate(prompts::SURVEY_SYSTEM_PROMPT, &prompt)?;
    if raw.trim().is_empty() {
        return Err(CoreError::MalformedResponse {
            detail: "the model returned no survey questions".into(),
        });
    }

    let value = ResponseRepairParser::new(repair).parse_value(&raw)?;
    let questions = normalize(value);
    info!("Generated {} survey question(s) for '{}'", questions.len(), author.name);
    Ok(questions)
}

/// The user turn: name, optional specialties and context, then the task.
pub fn survey_prompt(author: &AuthorInfo) -> String {
    let name = author.name.trim();
    let mut parts = vec![format!(
        "Professor name: {}.",
        if name.is_empty() { "Unknown" } else { name }
    )];
    if let Some(s) = author.specialties.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("Their specialties: {s}."));
    }
    if let Some(d) = author.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        parts.push(format!("Additional context: {d}"));
    }
    parts.push(prompts::SURVEY_TASK.to_string());
    parts.join(" ")
}

fn normalize(value: Value) -> Vec<SurveyQuestion> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut out: Vec<SurveyQuestion> = items
        .iter()
        .take(SURVEY_LEN)
        .enumerate()
        .map(|(i, item)| question_from(i, item))
        .collect();

    if out.len() < SURVEY_LEN {
        warn!("Model returned {} survey question(s); padding to {SURVEY_LEN}", out.len());
    }
    while out.len() < SURVEY_LEN {
        let n = out.len() + 1;
        out.push(SurveyQuestion {
            id: format!("q{n}"),
            text: format!("Question {n}."),
        });
    }
    out
}

fn question_from(i: usize, item: &Value) -> SurveyQuestion {
    let fallback = || format!("Question {}", i + 1);
    let (id, text) = match item {
        Value::Object(m) => {
            let id = m.get("id").and_then(non_empty_str).map(str::to_string);
            let text = m
                .get("text")
                .and_then(non_empty_str)
                .map(str::to_string)
                .or_else(|| m.get("question").map(display).filter(|s| !s.is_empty()))
                .unwrap_or_else(fallback);
            (id, text)
        }
        Value::Null => (None, fallback()),
        other => {
            let s = display(other);
            (None, if s.is_empty() { fallback() } else { s })
        }
    };

    let id = id
        .filter(|id| id.starts_with('q'))
        .unwrap_or_else(|| format!("q{}", i + 1));
    let text = match text.char_indices().nth(MAX_QUESTION_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    };
    SurveyQuestion { id, text }
}

fn non_empty_str(v: &Value) -> Option<&str> {
    v.as_str().filter(|s| !s.is_empty())
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(raw: &'static str) -> CoreResult<Vec<SurveyQuestion>> {
        let caller = move |_: &str, _: &str| -> CoreResult<String> { Ok(raw.to_string()) };
        generate_author_survey(&AuthorInfo::new("Dr. Ada"), &caller, &RepairConfig::default())
    }

    #[test]
    fn prompt_includes_optional_fields() {
        let mut a = AuthorInfo::new("  ");
        assert!(survey_prompt(&a).starts_with("Professor name: Unknown. Generate exactly 5"));
        a.name = "Dr. Ada".into();
        a.specialties = Some(" Mechanics ".into());
        a.description = Some("Loves derivations".into());
        let p = survey_prompt(&a);
        assert!(p.starts_with(
            "Professor name: Dr. Ada. Their specialties: Mechanics. Additional context: Loves derivations Generate"
        ));
    }

    #[test]
    fn well_formed_array_passes_through() {
        let qs = survey(
            r#"[{"id":"q1","text":"A?"},{"id":"q2","text":"B?"},{"id":"q3","text":"C?"},
                {"id":"q4","text":"D?"},{"id":"q5","text":"E?"},{"id":"q6","text":"F?"}]"#,
        )
        .unwrap();
        assert_eq!(qs.len(), 5);
        assert_eq!(qs[4], SurveyQuestion { id: "q5".into(), text: "E?".into() });
    }

    #[test]
    fn short_and_odd_answers_are_normalized() {
        let qs = survey("```json\n[{\"id\": 7, \"question\": \"Exam style?\"}, \"Plain string\"]\n```").unwrap();
        assert_eq!(qs.len(), 5);
        assert_eq!(qs[0], SurveyQuestion { id: "q1".into(), text: "Exam style?".into() });
        assert_eq!(qs[1], SurveyQuestion { id: "q2".into(), text: "Plain string".into() });
        assert_eq!(qs[2], SurveyQuestion { id: "q3".into(), text: "Question 3.".into() });
        assert_eq!(qs[4].id, "q5");
    }

    #[test]
    fn single_object_becomes_one_question() {
        let qs = survey(r#"{"id":"qa","text":"Only one?"}"#).unwrap();
        assert_eq!(qs[0], SurveyQuestion { id: "qa".into(), text: "Only one?".into() });
        assert_eq!(qs[1].text, "Question 2.");
    }

    #[test]
    fn long_text_is_capped() {
        let long = format!(r#"[{{"id":"q1","text":"{}"}}]"#, "é".repeat(600));
        let caller = move |_: &str, _: &str| -> CoreResult<String> { Ok(long.clone()) };
        let qs = generate_author_survey(&AuthorInfo::new("X"), &caller, &RepairConfig::default()).unwrap();
        assert_eq!(qs[0].text.chars().count(), MAX_QUESTION_CHARS);
    }

    #[test]
    fn blank_answer_is_malformed() {
        assert!(matches!(survey("  "), Err(CoreError::MalformedResponse { .. })));
    }
}
