//! Typed material groups.
//!
//! A material's kind drives two things: where its group lands in the user
//! prompt and which instruction text precedes it. Both come from a single
//! lookup table ([`MaterialKind::profile`]), so adding a kind means one enum
//! variant plus one table row, and the compiler flags any missed match.

use crate::error::ExtractionFailure;
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The semantic role of a group of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Past exams. The primary signal for what gets tested.
    PastTest,
    /// Author-provided handouts. Authoritative reference material.
    Handout,
    /// Student notes. Supporting context.
    Note,
    /// Previously generated study material. Structural reference only.
    PreviousOutput,
    Other,
}

/// Static per-kind data.
#[derive(Debug, Clone, Copy)]
pub struct KindProfile {
    /// Lower renders first.
    pub rank: u8,
    pub heading: &'static str,
    pub instruction: &'static str,
}

impl MaterialKind {
    /// Every kind, in prompt priority order.
    pub const ALL: [MaterialKind; 5] = [
        MaterialKind::PastTest,
        MaterialKind::Handout,
        MaterialKind::Note,
        MaterialKind::PreviousOutput,
        MaterialKind::Other,
    ];

    pub fn profile(self) -> KindProfile {
        match self {
            Self::PastTest => KindProfile {
                rank: 0,
                heading: prompts::PAST_TEST_HEADING,
                instruction: prompts::PAST_TEST_INSTRUCTION,
            },
            Self::Handout => KindProfile {
                rank: 1,
                heading: prompts::HANDOUT_HEADING,
                instruction: prompts::HANDOUT_INSTRUCTION,
            },
            Self::Note => KindProfile {
                rank: 2,
                heading: prompts::NOTE_HEADING,
                instruction: prompts::NOTE_INSTRUCTION,
            },
            Self::PreviousOutput => KindProfile {
                rank: 3,
                heading: prompts::PREVIOUS_OUTPUT_HEADING,
                instruction: prompts::PREVIOUS_OUTPUT_INSTRUCTION,
            },
            Self::Other => KindProfile {
                rank: 4,
                heading: prompts::OTHER_HEADING,
                instruction: prompts::OTHER_INSTRUCTION,
            },
        }
    }

    pub fn rank(self) -> u8 {
        self.profile().rank
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PastTest => "past_test",
            Self::Handout => "handout",
            Self::Note => "note",
            Self::PreviousOutput => "previous_output",
            Self::Other => "other",
        }
    }

    /// Whether this kind belongs on the reference side of a correlation.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Handout | Self::Note)
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "past_test" | "test" | "exam" => Ok(Self::PastTest),
            "handout" => Ok(Self::Handout),
            "note" | "notes" => Ok(Self::Note),
            "previous_output" | "study_guide" => Ok(Self::PreviousOutput),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown material kind '{other}'")),
        }
    }
}

/// One labeled document after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub label: String,
    /// Extracted text, or the reason there is none.
    pub extracted: Result<String, ExtractionFailure>,
}

impl Material {
    pub fn text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            extracted: Ok(text.into()),
        }
    }

    pub fn failed(label: impl Into<String>, failure: ExtractionFailure) -> Self {
        Self {
            label: label.into(),
            extracted: Err(failure),
        }
    }

    /// Wrap the result of a [`crate::TextExtractor`] call.
    ///
    /// A blank successful extraction is recorded as
    /// [`ExtractionFailure::NoExtractableText`] so that "no text" is always
    /// carried as a failure, never as an empty string.
    pub fn from_extraction(
        label: impl Into<String>,
        extracted: Result<String, ExtractionFailure>,
    ) -> Self {
        let label = label.into();
        let extracted = match extracted {
            Ok(t) if t.trim().is_empty() => Err(ExtractionFailure::NoExtractableText {
                label: label.clone(),
                format: "unknown".into(),
            }),
            other => other,
        };
        Self { label, extracted }
    }

    /// The text, if extraction produced anything non-blank.
    pub fn usable_text(&self) -> Option<&str> {
        match &self.extracted {
            Ok(t) if !t.trim().is_empty() => Some(t),
            _ => None,
        }
    }
}

/// A kind plus its members, in caller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialGroup {
    pub kind: MaterialKind,
    pub members: Vec<Material>,
}

impl MaterialGroup {
    pub fn new(kind: MaterialKind, members: Vec<Material>) -> Self {
        Self { kind, members }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether at least one member has usable text.
    pub fn has_usable_text(&self) -> bool {
        self.members.iter().any(|m| m.usable_text().is_some())
    }

    /// Labels of members that produced no usable text.
    pub fn unusable_labels(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.usable_text().is_none())
            .map(|m| m.label.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_priority_order() {
        let ranks: Vec<u8> = MaterialKind::ALL.iter().map(|k| k.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
        assert_eq!(MaterialKind::PastTest.rank(), 0);
    }

    #[test]
    fn every_kind_has_heading_and_instruction() {
        for kind in MaterialKind::ALL {
            let p = kind.profile();
            assert!(!p.heading.is_empty(), "{kind}");
            assert!(!p.instruction.is_empty(), "{kind}");
        }
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("study_guide".parse::<MaterialKind>(), Ok(MaterialKind::PreviousOutput));
        assert_eq!("Past-Test".parse::<MaterialKind>(), Ok(MaterialKind::PastTest));
        assert!("syllabus".parse::<MaterialKind>().is_err());
        for kind in MaterialKind::ALL {
            assert_eq!(kind.as_str().parse::<MaterialKind>(), Ok(kind));
        }
    }

    #[test]
    fn blank_extraction_becomes_failure() {
        let m = Material::from_extraction("scan.pdf", Ok("  \n ".into()));
        assert!(matches!(
            m.extracted,
            Err(ExtractionFailure::NoExtractableText { .. })
        ));
        assert!(m.usable_text().is_none());
    }

    #[test]
    fn group_reports_unusable_members() {
        let g = MaterialGroup::new(
            MaterialKind::Handout,
            vec![
                Material::text("a.txt", "Newton"),
                Material::failed(
                    "b.pdf",
                    ExtractionFailure::NoExtractableText {
                        label: "b.pdf".into(),
                        format: "pdf".into(),
                    },
                ),
            ],
        );
        assert!(g.has_usable_text());
        assert_eq!(g.unusable_labels(), vec!["b.pdf".to_string()]);
    }
}
