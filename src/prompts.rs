//! Prompt text for correlation, study-guide generation, and survey questions.
//!
//! Every sentence the model sees lives here so that tuning how one material
//! kind is treated means editing one constant. The assembly logic in
//! [`crate::assemble`] and [`crate::analysis`] only arranges these pieces.

// ── Material kinds ───────────────────────────────────────────────────────────

pub const PAST_TEST_HEADING: &str = "PAST TESTS  ⟵ Highest priority — primary exam signal";
pub const PAST_TEST_INSTRUCTION: &str = "These are PAST EXAMS / PAST TESTS — the highest-priority signal.
• Extract every topic, question type, and concept that was tested.
• Topics appearing across multiple tests are HIGH PRIORITY.
• Use question phrasing to understand how the professor frames concepts on exams.
• Every tested topic MUST appear in the final study guide.";

pub const HANDOUT_HEADING: &str = "PROFESSOR HANDOUTS  ⟵ High priority — authoritative content";
pub const HANDOUT_INSTRUCTION: &str = "These are PROFESSOR HANDOUTS — authoritative course content.
• Use the professor's exact terminology for all definitions.
• Include every concept, framework, and example the professor chose to present.
• Weight these heavily alongside past tests.";

pub const NOTE_HEADING: &str = "STUDENT NOTES  ⟵ Supporting context";
pub const NOTE_INSTRUCTION: &str = "These are STUDENT NOTES — supporting context.
• Use to elaborate on concepts from handouts.
• When notes conflict with handouts, defer to handout wording.
• Lower priority than handouts and past tests.";

pub const PREVIOUS_OUTPUT_HEADING: &str = "PREVIOUS STUDY GUIDES  ⟵ Structural reference only";
pub const PREVIOUS_OUTPUT_INSTRUCTION: &str = "This is a PREVIOUS STUDY GUIDE — structural reference only.
• Do not copy it. Identify what it covers and what it misses.
• Cross-reference with past tests to find gaps.
• Lowest priority; the new guide should improve on it.";

pub const OTHER_HEADING: &str = "SUPPLEMENTARY MATERIALS";
pub const OTHER_INSTRUCTION: &str =
    "SUPPLEMENTARY MATERIAL — use for additional context and breadth of coverage.";

// ── System instruction blocks ────────────────────────────────────────────────

pub const BASE_PERSONA: &str = "You are an expert, exam-focused study guide generator.
Your goal is to help students succeed on their specific professor's exams.

";

/// Appended to the author profile block.
pub const PROFILE_USAGE: &str = "
Use this profile to:
• Mirror this professor's terminology and reasoning style.
• Elevate topics this professor is known to emphasize.
• Frame all explanations the way this professor would.

";

pub const QUIZ_QA_HEADING: &str =
    "## Student's answers about this professor (use to tailor the study guide):\n";

pub const HISTORY_HEADING: &str = "## Professor's Historical Exam Patterns\n";

pub const WEIGHTING_BLOCK: &str = "SOURCE WEIGHTING — when topics conflict or context space is limited, apply in this order:
  1. Past tests        → determines what MUST be in the guide
  2. Professor profile → shapes emphasis, terminology, and tone
  3. Handouts          → authoritative definitions and frameworks
  4. Student notes     → supporting elaboration
  5. Previous study guides → structural reference only
";

pub const OUTPUT_FORMAT_BLOCK: &str = "OUTPUT FORMAT — respond in Markdown using this exact structure:

## Overview
2–3 sentences covering what this guide focuses on and the highest-priority areas.

## Topics
For each major topic:

### [Topic Name]
**Priority:** HIGH | MEDIUM | LOW
*(HIGH = appears on past tests or explicitly emphasized by the professor)*
**Sources:** [which materials covered this]
- Key concepts, definitions, and details to know

## High-Priority Topics at a Glance
Bulleted list of every HIGH priority topic (quick-reference checklist).

## Practice Questions
8–12 questions modeled on the past tests. Include a brief answer for each.
Format each as:
**Q:** question text
**A:** answer text

## Coverage Gaps
Flag any topics from the materials that were NOT tested in past exams (and vice versa).
";

pub const SELF_CHECK_BLOCK: &str = "BEFORE WRITING THE FINAL OUTPUT — silently run this checklist:
1. Every topic from the past tests appears in the Topics section and is marked HIGH.
2. Every HIGH-priority topic has at least one Practice Question.
3. The professor's known emphasis (from their profile) is reflected in the priority labels.
4. No topic is marked HIGH unless it appears in past tests or the professor profile.
Fix any failures before producing the output.
";

// ── User prompt pieces ───────────────────────────────────────────────────────

pub const SPECIAL_INSTRUCTIONS_HEADING: &str = "**Student's special instructions:**";
pub const HISTORY_ANALYSIS_HEADING: &str = "\n---\n## Historical Test Analysis";
pub const UNTESTED_WARNING: &str = "⚠ Not yet tested — treat as lower priority:";

/// Replaces every member once the running total reaches the cap.
pub const OMITTED_MARKER: &str = "*[Omitted — total context limit reached]*";

/// Shown instead of calling the model when nothing had usable text.
pub const NO_CONTENT_MESSAGE: &str = "*No content could be extracted from the uploaded files. \
Please upload PDF, TXT, MD, DOC, DOCX, RTF, ODT, or HTML files with readable content.*";

/// Shown when the model answered with blank text.
pub const NO_RESPONSE_MESSAGE: &str = "*No response generated.*";

/// Visible marker appended to a source cut at the per-source cap.
pub fn source_truncated_marker(omitted: &str) -> String {
    format!("\n\n*[Source truncated — {omitted} characters omitted]*")
}

// ── Correlation ──────────────────────────────────────────────────────────────

pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a professor exam analysis tool. Output valid JSON only.";

pub const ANALYSIS_REFERENCE_HEADING: &str = "## Handout/Note Materials\n";
pub const ANALYSIS_TEST_HEADING: &str = "## Test Questions\n";
pub const ANALYSIS_TRUNCATED_MARKER: &str = "\n\n*[truncated]*";
pub const ANALYSIS_NO_TEXT: &str = "(no text extracted)";

/// The JSON contract the correlation call must follow.
pub const ANALYSIS_CONTRACT: &str = r#"Analyze how the test draws from the handouts. Return JSON:
{
  "topic_frequency": {"topic_name": count_of_questions_on_that_topic},
  "conversion_patterns": {"verbatim": n, "conceptually_transformed": n, "applied_to_new_scenario": n},
  "question_formats": {"multiple_choice": n, "free_response": n, "problem_solving": n, "short_answer": n},
  "high_signal_handouts": [{"file_name": "str", "topic_coverage": "str", "question_count": n}],
  "summary": "2-3 sentence summary of how this professor converts handout content into exam questions"
}"#;

// ── Survey ───────────────────────────────────────────────────────────────────

pub const SURVEY_SYSTEM_PROMPT: &str = "You are a helpful assistant that creates short survey questions for students \
about their professor. Your output will be parsed as JSON. \
Respond with ONLY a valid JSON array of exactly 5 objects. \
Each object must have exactly two keys: \"id\" (string: \"q1\", \"q2\", \"q3\", \"q4\", \"q5\") \
and \"text\" (string: the question, one short sentence). \
No markdown, no code fences, no explanation — only the JSON array.";

pub const SURVEY_TASK: &str = "Generate exactly 5 questions that help tailor a study guide for this professor. \
Focus on: exam style, what they emphasize, question formats they use, topics they care about, \
or weak areas the student wants to focus on. Keep each question concise and useful for study guide generation.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_names_every_result_field() {
        for field in [
            "topic_frequency",
            "conversion_patterns",
            "question_formats",
            "high_signal_handouts",
            "summary",
        ] {
            assert!(ANALYSIS_CONTRACT.contains(field), "{field}");
        }
    }

    #[test]
    fn weighting_lists_past_tests_first() {
        let tests = WEIGHTING_BLOCK.find("Past tests").unwrap();
        let notes = WEIGHTING_BLOCK.find("Student notes").unwrap();
        assert!(tests < notes);
    }

    #[test]
    fn truncation_marker_carries_count() {
        assert!(source_truncated_marker("1,234").contains("1,234 characters omitted"));
    }
}
