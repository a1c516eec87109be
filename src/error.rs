//! Error types for the coursemind library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CoreError`] is **fatal**: the operation cannot produce a result at all
//!   (an analysis block is missing its past test, every file on one side is
//!   unreadable, the model's JSON is beyond repair, no provider is configured).
//!   Returned as `Err(CoreError)` from analysis and generation entry points.
//!
//! * [`ExtractionFailure`] is **non-fatal**: a single document yielded no text.
//!   Stored on the [`crate::material::Material`] it belongs to, so one
//!   unreadable handout never aborts a batch. The absence of text *is* the
//!   signal; extraction itself never returns `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the coursemind library.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Analysis preconditions ────────────────────────────────────────────
    /// Neither the past-test side nor the reference side has any file.
    #[error("This test block is empty — add a past test and at least one handout or note before analyzing.")]
    EmptyBlock,

    /// The past-test side of the block has no file.
    #[error("No past test in this block — add a past test file before analyzing.")]
    MissingPastTest,

    /// The handout/note side of the block has no file.
    #[error("No handouts or notes in this block — add handout/note files before analyzing.")]
    MissingReferenceMaterial,

    /// Every file on at least one side produced no usable text.
    ///
    /// A non-empty list means that entire side is unusable; an empty list means
    /// that side had at least one readable file.
    #[error("{}", no_usable_content_message(.past_tests, .references))]
    NoUsableContent {
        past_tests: Vec<String>,
        references: Vec<String>,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// Every JSON repair strategy failed on the model's response.
    #[error("Model response is not valid JSON and could not be repaired: {detail}")]
    MalformedResponse { detail: String },

    /// The model could not be reached: missing credential, unknown provider,
    /// or a transport failure. Not retried locally.
    #[error("Model provider '{provider}' is unavailable: {detail}")]
    ModelUnavailable { provider: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn no_usable_content_message(past_tests: &[String], references: &[String]) -> String {
    let mut sides = Vec::new();
    if !past_tests.is_empty() {
        sides.push(format!("past test file(s) {}", past_tests.join(", ")));
    }
    if !references.is_empty() {
        sides.push(format!("handout/note file(s) {}", references.join(", ")));
    }
    format!(
        "No readable text could be extracted from {}. \
         Re-upload them as text-based PDF, DOCX, RTF, ODT, HTML, TXT or MD files.",
        sides.join(" and ")
    )
}

/// Convenience alias used across the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// A non-fatal failure for a single document.
///
/// Kept distinct from a successful-but-short extraction so callers can tell
/// "the file is missing" apart from "the file has no text layer".
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionFailure {
    /// The stored location did not resolve to a readable file.
    #[error("'{}' could not be found", location.display())]
    NotFound { location: PathBuf },

    /// The file was read but every extraction strategy came back empty.
    #[error("'{label}' ({format}) contains no extractable text")]
    NoExtractableText { label: String, format: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_usable_content_names_both_sides() {
        let e = CoreError::NoUsableContent {
            past_tests: vec!["midterm.pdf".into()],
            references: vec!["week1.docx".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("midterm.pdf"), "got: {msg}");
        assert!(msg.contains("week1.docx"), "got: {msg}");
    }

    #[test]
    fn no_usable_content_single_side() {
        let e = CoreError::NoUsableContent {
            past_tests: vec![],
            references: vec!["scan.pdf".into(), "photo.pdf".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.pdf, photo.pdf"), "got: {msg}");
        assert!(!msg.contains("past test file"), "got: {msg}");
    }

    #[test]
    fn precondition_messages_name_the_remedy() {
        assert!(CoreError::MissingPastTest.to_string().contains("add a past test"));
        assert!(CoreError::MissingReferenceMaterial
            .to_string()
            .contains("handout/note"));
    }

    #[test]
    fn extraction_failure_display() {
        let f = ExtractionFailure::NotFound {
            location: PathBuf::from("uploads/a.pdf"),
        };
        assert!(f.to_string().contains("uploads/a.pdf"));

        let f = ExtractionFailure::NoExtractableText {
            label: "scan.pdf".into(),
            format: "pdf".into(),
        };
        assert!(f.to_string().contains("scan.pdf"));
    }

    #[test]
    fn model_unavailable_display() {
        let e = CoreError::ModelUnavailable {
            provider: "gemini".into(),
            detail: "GEMINI_API_KEY is not set".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("GEMINI_API_KEY"));
    }
}
