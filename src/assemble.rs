//! Prompt assembly for study-guide generation.
//!
//! ## Why put the profile in the system instruction?
//!
//! The system turn acts as a standing lens over every decision the model
//! makes, so the author profile, historical exam patterns, weighting policy,
//! output contract and self-check all live there. The user turn carries only
//! the request context and the materials.
//!
//! ## Budget
//!
//! Materials are rendered in kind priority order. Each member is cut to
//! `max_chars_per_source` (preferring the last newline past the midpoint)
//! with a visible omitted-count marker. Once the running total reaches
//! `max_total_chars`, every later member is replaced by an explicit omission
//! marker; nothing is dropped silently.

use crate::config::{CoreConfig, PromptBudget};
use crate::error::CoreResult;
use crate::material::{MaterialGroup, MaterialKind};
use crate::output::{
    AuthorInfo, AuthorProfile, CorrelationResult, GuideOutput, GuideStatus, PromptContext,
};
use crate::pipeline::llm::ModelCaller;
use crate::pipeline::sanitize::sanitize;
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

/// Builds system instructions and budgeted user prompts.
#[derive(Debug, Clone, Copy)]
pub struct PromptAssembler {
    budget: PromptBudget,
    top_topics: usize,
}

impl PromptAssembler {
    pub fn new(budget: PromptBudget) -> Self {
        Self {
            budget,
            top_topics: 10,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            budget: config.budget,
            top_topics: config.top_topics,
        }
    }

    /// How many historical topics the system instruction names.
    pub fn with_top_topics(mut self, n: usize) -> Self {
        self.top_topics = n;
        self
    }

    /// Persona, then the optional author and history blocks, then the fixed
    /// weighting, output-contract and self-check blocks.
    pub fn build_system_instruction(
        &self,
        author: Option<&AuthorInfo>,
        history: Option<&AuthorProfile>,
    ) -> String {
        let mut out = String::from(prompts::BASE_PERSONA);

        if let Some(author) = author {
            let _ = writeln!(out, "## Professor Profile: {}", author.name.trim());
            if let Some(s) = non_blank(author.specialties.as_deref()) {
                let _ = writeln!(out, "Specialties: {s}");
            }
            if let Some(d) = non_blank(author.description.as_deref()) {
                let _ = writeln!(out, "Teaching style and emphasis: {d}");
            }
            out.push_str(prompts::PROFILE_USAGE);

            if !author.quiz_qa.is_empty() {
                out.push_str(prompts::QUIZ_QA_HEADING);
                for pair in &author.quiz_qa {
                    let q = pair.question.trim();
                    let a = pair.answer.trim();
                    if q.is_empty() && a.is_empty() {
                        continue;
                    }
                    let _ = write!(out, "Q: {}\nA: {}\n\n", or_dash(q), or_dash(a));
                }
                out.push('\n');
            }
        }

        if let Some(profile) = history.filter(|p| !p.is_empty()) {
            out.push_str(&self.history_block(profile));
        }

        out.push_str(prompts::WEIGHTING_BLOCK);
        out.push('\n');
        out.push_str(prompts::OUTPUT_FORMAT_BLOCK);
        out.push('\n');
        out.push_str(prompts::SELF_CHECK_BLOCK);
        out
    }

    fn history_block(&self, profile: &AuthorProfile) -> String {
        let mut block = String::from(prompts::HISTORY_HEADING);
        if !profile.tested_topics.is_empty() {
            let topics: Vec<&str> = profile
                .tested_topics
                .iter()
                .take(self.top_topics)
                .map(|t| t.topic.as_str())
                .collect();
            let _ = writeln!(
                block,
                "Topics this professor consistently tests (ordered by frequency): {}",
                topics.join(", ")
            );
        }
        let formats: Vec<String> = profile
            .preferred_formats
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(name, n)| format!("{name}: {n}"))
            .collect();
        if !formats.is_empty() {
            let _ = writeln!(block, "Preferred question formats: {}", formats.join(", "));
        }
        if profile.pairs_analyzed > 0 {
            let _ = writeln!(
                block,
                "Based on {} analyzed test-handout pair(s).",
                profile.pairs_analyzed
            );
        }
        block.push('\n');
        block
    }

    /// The user turn.
    ///
    /// Returns `""` when no material has usable text, so the caller can
    /// short-circuit instead of sending a turn with nothing to work from.
    pub fn build_user_prompt(
        &self,
        context: &PromptContext,
        special_instructions: Option<&str>,
        groups: &[MaterialGroup],
        history: Option<&[CorrelationResult]>,
    ) -> String {
        let ranked = rank_materials(groups);
        if ranked.iter().all(|(_, members)| members.is_empty()) {
            debug!("No material with usable text; returning empty prompt");
            return String::new();
        }

        let mut parts: Vec<String> = Vec::new();

        if !context.fields.is_empty() {
            let header: Vec<String> = context
                .fields
                .iter()
                .map(|(label, value)| format!("**{label}:** {value}"))
                .collect();
            parts.push(header.join("\n"));
        }

        if let Some(s) = non_blank(special_instructions) {
            parts.push(format!("\n{}\n{s}", prompts::SPECIAL_INSTRUCTIONS_HEADING));
        }

        if let Some(results) = history.filter(|r| !r.is_empty()) {
            parts.push(history_analysis(results));
        }

        let mut total: usize = parts.iter().map(|p| p.chars().count()).sum();
        let mut omitted = 0usize;

        for (kind, members) in ranked {
            if members.is_empty() {
                continue;
            }
            let profile = kind.profile();
            parts.push(format!(
                "\n---\n## {}\n_{}_",
                profile.heading, profile.instruction
            ));
            for (label, text) in members {
                let label = sanitize(label);
                if total >= self.budget.max_total_chars {
                    omitted += 1;
                    parts.push(format!("\n### {label}\n{}\n", prompts::OMITTED_MARKER));
                    continue;
                }
                let body = truncate_source(&sanitize(text), self.budget.max_chars_per_source);
                total += body.chars().count();
                parts.push(format!("\n### {label}\n\n{body}\n"));
            }
        }

        if omitted > 0 {
            warn!(
                "Total prompt budget of {} chars reached; omitted {omitted} source(s)",
                self.budget.max_total_chars
            );
        }
        parts.join("\n")
    }
}

/// Usable members bucketed by kind, buckets in priority order.
fn rank_materials(groups: &[MaterialGroup]) -> Vec<(MaterialKind, Vec<(&str, &str)>)> {
    let mut kinds = MaterialKind::ALL;
    kinds.sort_by_key(|k| k.rank());
    kinds
        .into_iter()
        .map(|kind| {
            let members = groups
                .iter()
                .filter(|g| g.kind == kind)
                .flat_map(|g| g.members.iter())
                .filter_map(|m| m.usable_text().map(|t| (m.label.as_str(), t)))
                .collect();
            (kind, members)
        })
        .collect()
}

fn history_analysis(results: &[CorrelationResult]) -> String {
    let mut lines = vec![prompts::HISTORY_ANALYSIS_HEADING.to_string()];
    for r in results {
        if !r.summary.trim().is_empty() {
            lines.push(format!("\n**Analysis:** {}", r.summary.trim()));
        }
        for hs in &r.high_signal_handouts {
            lines.push(format!(
                "- **{}**: {} ({} question(s) from this source)",
                hs.file_name, hs.topic_coverage, hs.question_count
            ));
        }
        for topic in r.untested_topics() {
            lines.push(format!("  {} {topic}", prompts::UNTESTED_WARNING));
        }
    }
    lines.join("\n")
}

/// Cut `text` to at most `max_chars` characters plus a marker.
///
/// Breaks at the last newline before the cap when that newline lies past
/// the midpoint, otherwise cuts hard at the cap.
pub fn truncate_source(text: &str, max_chars: usize) -> String {
    let Some((cap_byte, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let total = text.chars().count();
    let cut_byte = match text[..cap_byte].rfind('\n') {
        Some(nl) if text[..nl].chars().count() > max_chars / 2 => nl,
        _ => cap_byte,
    };
    let kept = text[..cut_byte].chars().count();
    format!(
        "{}{}",
        &text[..cut_byte],
        prompts::source_truncated_marker(&thousands(total - kept))
    )
}

/// `1234567` → `"1,234,567"`.
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "—"
    } else {
        s
    }
}

// ── Guide generation ─────────────────────────────────────────────────────────

/// Everything needed to generate one study guide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideRequest {
    pub context: PromptContext,
    pub special_instructions: Option<String>,
    pub groups: Vec<MaterialGroup>,
    pub author: Option<AuthorInfo>,
    /// The author's aggregated profile, if any analyses exist.
    pub author_profile: Option<AuthorProfile>,
    /// Correlation results for the blocks relevant to this request.
    pub history: Vec<CorrelationResult>,
}

/// Assemble both prompts and call the model.
///
/// When no material has usable text the model is not called and the output
/// carries [`GuideStatus::NoUsableContent`] with a user-facing message.
pub fn generate_guide<C: ModelCaller + ?Sized>(
    request: &GuideRequest,
    caller: &C,
    config: &CoreConfig,
) -> CoreResult<GuideOutput> {
    let assembler = PromptAssembler::from_config(config);
    let system = assembler.build_system_instruction(
        request.author.as_ref(),
        request.author_profile.as_ref(),
    );
    let history = (!request.history.is_empty()).then_some(request.history.as_slice());
    let user = assembler.build_user_prompt(
        &request.context,
        request.special_instructions.as_deref(),
        &request.groups,
        history,
    );

    if user.trim().is_empty() {
        info!("Skipping generation: no usable content");
        return Ok(GuideOutput {
            content: prompts::NO_CONTENT_MESSAGE.to_string(),
            status: GuideStatus::NoUsableContent,
        });
    }

    info!(
        "Generating guide: system {} chars, user {} chars",
        system.chars().count(),
        user.chars().count()
    );
    let raw = caller.generate(&system, &user)?;
    if raw.trim().is_empty() {
        warn!("Model returned an empty guide");
        return Ok(GuideOutput {
            content: prompts::NO_RESPONSE_MESSAGE.to_string(),
            status: GuideStatus::EmptyResponse,
        });
    }
    Ok(GuideOutput {
        content: raw.trim().to_string(),
        status: GuideStatus::Generated,
    })
}
