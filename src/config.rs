//! Configuration types for extraction, analysis, and prompt assembly.
//!
//! Every tunable lives in [`CoreConfig`], built via its [`CoreConfigBuilder`]
//! or read from the environment with [`CoreConfig::from_env`]. Nothing in the
//! crate reads ambient settings: each entry point receives the config (or the
//! relevant sub-struct) explicitly, so two hosts with different upload roots or
//! budgets can share one process.

use crate::error::CoreError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default per-source cap when assembling a generation prompt (~3k tokens).
pub const DEFAULT_MAX_CHARS_PER_SOURCE: usize = 12_000;
/// Default cap on the whole user turn (~18k tokens).
pub const DEFAULT_MAX_TOTAL_CHARS: usize = 72_000;
/// Default per-file cap inside a correlation prompt.
pub const DEFAULT_ANALYSIS_CHARS_PER_FILE: usize = 10_000;
/// How far back (in characters) the salvage pass walks from a parse failure.
pub const DEFAULT_SALVAGE_WINDOW: usize = 1_000;

/// Character ceilings enforced while assembling a user turn.
///
/// Once the running total reaches `max_total_chars`, every remaining source is
/// replaced by an explicit omission marker rather than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBudget {
    /// Maximum characters kept from any single source. Default: 12 000.
    pub max_chars_per_source: usize,
    /// Running-total threshold for the whole user turn. Default: 72 000.
    pub max_total_chars: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            max_chars_per_source: DEFAULT_MAX_CHARS_PER_SOURCE,
            max_total_chars: DEFAULT_MAX_TOTAL_CHARS,
        }
    }
}

/// Tuning for [`crate::pipeline::repair::ResponseRepairParser`].
///
/// Both values are empirical. They are kept configurable rather than
/// hard-coded so a stricter policy can be swapped in without touching callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Characters walked backward from the failure offset during salvage.
    pub salvage_window: usize,
    /// Suffixes appended at the failure offset, tried in order.
    pub closing_suffixes: Vec<String>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            salvage_window: DEFAULT_SALVAGE_WINDOW,
            closing_suffixes: vec!["\"}\n}".into(), "}".into(), "}\n}".into()],
        }
    }
}

/// Where stored documents live and how the PDF fallback engine is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Canonical upload base supplied by the host.
    ///
    /// Stored paths are often relative to whatever working directory the
    /// writing process had; this base is the fallback root for resolving them.
    pub storage_base: Option<PathBuf>,

    /// Well-known subdirectories under `storage_base`, tried in order.
    pub storage_subdirs: Vec<String>,

    /// Explicit pdfium shared library. When `None`, a library previously
    /// cached by `pdfium-auto` or installed system-wide is used if present.
    pub pdfium_library_path: Option<PathBuf>,

    /// Lower-case extensions a host should accept on upload.
    pub allowed_extensions: BTreeSet<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            storage_base: None,
            storage_subdirs: vec!["course_files".into(), "syllabi".into()],
            pdfium_library_path: None,
            allowed_extensions: ["pdf", "txt", "md", "doc", "docx", "rtf", "odt", "html", "htm"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExtractionConfig {
    /// Whether `ext` (with or without a leading dot, any case) may be uploaded.
    pub fn is_allowed(&self, ext: &str) -> bool {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.contains(&ext)
    }
}

/// Configuration shared by every coursemind entry point.
///
/// # Example
/// ```rust
/// use coursemind::CoreConfig;
///
/// let config = CoreConfig::builder()
///     .max_chars_per_source(8_000)
///     .max_total_chars(48_000)
///     .storage_base("/srv/coursemind/uploads")
///     .build()
///     .unwrap();
/// assert_eq!(config.budget.max_chars_per_source, 8_000);
/// ```
#[derive(Clone)]
pub struct CoreConfig {
    pub extraction: ExtractionConfig,

    pub budget: PromptBudget,

    /// Per-file cap inside a correlation prompt. Default: 10 000.
    pub analysis_chars_per_file: usize,

    pub repair: RepairConfig,

    /// Number of historically tested topics named in the system instruction. Default: 10.
    pub top_topics: usize,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// Sampling temperature for every model call. Default: 0.2.
    pub temperature: f32,

    /// Output-token ceiling for correlation calls. Default: 4096.
    pub analysis_max_tokens: usize,

    /// Output-token ceiling for study-guide generation. Default: 8192.
    pub generation_max_tokens: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            budget: PromptBudget::default(),
            analysis_chars_per_file: DEFAULT_ANALYSIS_CHARS_PER_FILE,
            repair: RepairConfig::default(),
            top_topics: 10,
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.2,
            analysis_max_tokens: 4096,
            generation_max_tokens: 8192,
        }
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("extraction", &self.extraction)
            .field("budget", &self.budget)
            .field("analysis_chars_per_file", &self.analysis_chars_per_file)
            .field("repair", &self.repair)
            .field("top_topics", &self.top_topics)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("analysis_max_tokens", &self.analysis_max_tokens)
            .field("generation_max_tokens", &self.generation_max_tokens)
            .finish()
    }
}

impl CoreConfig {
    /// Create a new builder for `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read overrides from the environment, falling back to defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `COURSEMIND_STORAGE_BASE` | `extraction.storage_base` |
    /// | `COURSEMIND_LLM_PROVIDER` | `provider_name` |
    /// | `COURSEMIND_MODEL` | `model` |
    /// | `PDFIUM_LIB_PATH` | `extraction.pdfium_library_path` |
    /// | `COURSEMIND_MAX_CHARS_PER_SOURCE` | `budget.max_chars_per_source` |
    /// | `COURSEMIND_MAX_TOTAL_CHARS` | `budget.max_total_chars` |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.extraction.storage_base = env_non_empty("COURSEMIND_STORAGE_BASE").map(PathBuf::from);
        config.extraction.pdfium_library_path = env_non_empty("PDFIUM_LIB_PATH").map(PathBuf::from);
        config.provider_name = env_non_empty("COURSEMIND_LLM_PROVIDER");
        config.model = env_non_empty("COURSEMIND_MODEL");
        config.budget.max_chars_per_source = env_usize(
            "COURSEMIND_MAX_CHARS_PER_SOURCE",
            DEFAULT_MAX_CHARS_PER_SOURCE,
        );
        config.budget.max_total_chars =
            env_usize("COURSEMIND_MAX_TOTAL_CHARS", DEFAULT_MAX_TOTAL_CHARS);
        config
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env_non_empty(key)
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Builder for [`CoreConfig`].
#[derive(Debug)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    pub fn storage_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.config.extraction.storage_base = Some(base.into());
        self
    }

    pub fn storage_subdirs<I, S>(mut self, subdirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extraction.storage_subdirs = subdirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.extraction.pdfium_library_path = Some(path.into());
        self
    }

    pub fn budget(mut self, budget: PromptBudget) -> Self {
        self.config.budget = budget;
        self
    }

    pub fn max_chars_per_source(mut self, n: usize) -> Self {
        self.config.budget.max_chars_per_source = n;
        self
    }

    pub fn max_total_chars(mut self, n: usize) -> Self {
        self.config.budget.max_total_chars = n;
        self
    }

    pub fn analysis_chars_per_file(mut self, n: usize) -> Self {
        self.config.analysis_chars_per_file = n;
        self
    }

    pub fn salvage_window(mut self, chars: usize) -> Self {
        self.config.repair.salvage_window = chars;
        self
    }

    pub fn closing_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.repair.closing_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn top_topics(mut self, n: usize) -> Self {
        self.config.top_topics = n;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn analysis_max_tokens(mut self, n: usize) -> Self {
        self.config.analysis_max_tokens = n;
        self
    }

    pub fn generation_max_tokens(mut self, n: usize) -> Self {
        self.config.generation_max_tokens = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CoreConfig, CoreError> {
        let c = &self.config;
        if c.budget.max_chars_per_source == 0 || c.budget.max_total_chars == 0 {
            return Err(CoreError::InvalidConfig(
                "Prompt budget caps must be ≥ 1".into(),
            ));
        }
        if c.analysis_chars_per_file == 0 {
            return Err(CoreError::InvalidConfig(
                "analysis_chars_per_file must be ≥ 1".into(),
            ));
        }
        if c.repair.closing_suffixes.iter().any(|s| s.is_empty()) {
            return Err(CoreError::InvalidConfig(
                "closing suffixes must not be empty strings".into(),
            ));
        }
        if c.analysis_max_tokens == 0 || c.generation_max_tokens == 0 {
            return Err(CoreError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budget() {
        let c = CoreConfig::default();
        assert_eq!(c.budget.max_chars_per_source, 12_000);
        assert_eq!(c.budget.max_total_chars, 72_000);
        assert_eq!(c.analysis_chars_per_file, 10_000);
        assert_eq!(c.repair.salvage_window, 1_000);
        assert_eq!(c.repair.closing_suffixes, vec!["\"}\n}", "}", "}\n}"]);
        assert_eq!(c.extraction.storage_subdirs, vec!["course_files", "syllabi"]);
    }

    #[test]
    fn builder_rejects_zero_budget() {
        let err = CoreConfig::builder().max_total_chars(0).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_suffix() {
        let err = CoreConfig::builder()
            .closing_suffixes(["}", ""])
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = CoreConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn allowed_extensions_ignore_case_and_dot() {
        let e = ExtractionConfig::default();
        assert!(e.is_allowed("PDF"));
        assert!(e.is_allowed(".docx"));
        assert!(e.is_allowed("htm"));
        assert!(!e.is_allowed("exe"));
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", CoreConfig::default());
        assert!(s.contains("CoreConfig"));
        assert!(s.contains("max_chars_per_source"));
    }
}
