//! # coursemind
//!
//! Turn a pile of course documents into exam-focused model prompts.
//!
//! ## Why this crate?
//!
//! Students upload whatever they have: scanned-then-OCR'd PDFs, Word handouts,
//! RTF exports from ancient word processors, HTML saved from the course site.
//! A generation call is only as good as the text that reaches it, and only as
//! cheap as the budget it respects. This crate owns the careful part:
//! best-effort extraction with per-format fallback chains, correlation of
//! handouts against past exams (with a parser that survives truncated or
//! sloppy model JSON), and prompt assembly that ranks material by how
//! predictive it is and never blows the character budget.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SourceDocument
//!  │
//!  ├─ 1. Input     resolve stored path (base dir + subdirs) or materialise bytes
//!  ├─ 2. Extract   per-format strategy chain, first non-empty result wins
//!  ├─ 3. Sanitize  lossy UTF-8, strip NUL, blank out control characters
//!  ├─ 4a. Analyze  past tests × handouts → model → repaired JSON → CorrelationResult
//!  │               └─ AuthorAnalyses: one live result per unit → AuthorProfile
//!  └─ 4b. Assemble persona + profile + history + weighted, budgeted materials
//!                  → model → GuideOutput
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coursemind::{
//!     CoreConfig, CoreResult, Material, MaterialGroup, MaterialKind,
//!     PromptAssembler, PromptContext, TextExtractor,
//! };
//!
//! fn main() -> CoreResult<()> {
//!     let config = CoreConfig::default();
//!     let extractor = TextExtractor::new(&config.extraction);
//!
//!     let handouts = MaterialGroup::new(
//!         MaterialKind::Handout,
//!         vec![Material::from_extraction(
//!             "week1.docx",
//!             extractor.extract_path("uploads/week1.docx", "docx"),
//!         )],
//!     );
//!
//!     let assembler = PromptAssembler::new(config.budget);
//!     let context = PromptContext::new().field("Course", "PHYS 101");
//!     let prompt = assembler.build_user_prompt(&context, None, &[handouts], None);
//!     println!("{prompt}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `coursemind` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium library used by the last-resort PDF engine |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! coursemind = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod assemble;
pub mod config;
pub mod document;
pub mod error;
pub mod material;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod survey;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::CorrelationAnalyzer;
pub use assemble::{generate_guide, GuideRequest, PromptAssembler};
pub use config::{CoreConfig, CoreConfigBuilder, ExtractionConfig, PromptBudget, RepairConfig};
pub use document::{DocumentFormat, DocumentSource, SourceDocument};
pub use error::{CoreError, CoreResult, ExtractionFailure};
pub use material::{Material, MaterialGroup, MaterialKind};
pub use output::{
    AuthorInfo, AuthorProfile, ConversionPatterns, CorrelationResult, GuideOutput, GuideStatus,
    HighSignalFile, PromptContext, QaPair, QuestionFormats, SurveyQuestion, TestedTopic,
};
pub use pipeline::extract::TextExtractor;
pub use pipeline::llm::{ModelCaller, ProviderModelCaller};
pub use pipeline::repair::ResponseRepairParser;
pub use pipeline::sanitize::sanitize;
pub use profile::AuthorAnalyses;
pub use survey::generate_author_survey;
