//! The model-caller seam.
//!
//! Everything above this module talks to a model through one synchronous
//! call: system instruction and user prompt in, raw text out. Hosts plug in
//! their own transport by implementing [`ModelCaller`] (any
//! `Fn(&str, &str) -> CoreResult<String>` closure already does), or use
//! [`ProviderModelCaller`] to reach any `edgequake-llm` provider.
//!
//! No retries happen here. Cancellation and timeouts belong to the caller's
//! transport.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// Synchronous `generate(system_instruction, user_prompt) -> raw_text`.
///
/// Transport and quota failures are returned as-is; the core only interprets
/// the content of a successful response.
pub trait ModelCaller {
    fn generate(&self, system_instruction: &str, user_prompt: &str) -> CoreResult<String>;
}

impl<F> ModelCaller for F
where
    F: Fn(&str, &str) -> CoreResult<String>,
{
    fn generate(&self, system_instruction: &str, user_prompt: &str) -> CoreResult<String> {
        self(system_instruction, user_prompt)
    }
}

/// Adapts an async `edgequake-llm` provider to [`ModelCaller`].
///
/// Owns a current-thread tokio runtime and blocks on each call, so it must
/// not be used from inside another async runtime.
pub struct ProviderModelCaller {
    provider: Arc<dyn LLMProvider>,
    label: String,
    options: CompletionOptions,
    runtime: Runtime,
}

impl fmt::Debug for ProviderModelCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderModelCaller")
            .field("provider", &self.label)
            .field("temperature", &self.options.temperature)
            .field("max_tokens", &self.options.max_tokens)
            .finish()
    }
}

impl ProviderModelCaller {
    /// Wrap an already-constructed provider.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        label: impl Into<String>,
        temperature: f32,
        max_tokens: usize,
    ) -> CoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create tokio runtime: {e}")))?;
        Ok(Self {
            provider,
            label: label.into(),
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
            runtime,
        })
    }

    /// Caller tuned for correlation requests (`analysis_max_tokens`).
    pub fn for_analysis(config: &CoreConfig) -> CoreResult<Self> {
        let provider = resolve_provider(config)?;
        Self::new(
            provider,
            provider_label(config),
            config.temperature,
            config.analysis_max_tokens,
        )
    }

    /// Caller tuned for study-guide and survey generation (`generation_max_tokens`).
    pub fn for_generation(config: &CoreConfig) -> CoreResult<Self> {
        let provider = resolve_provider(config)?;
        Self::new(
            provider,
            provider_label(config),
            config.temperature,
            config.generation_max_tokens,
        )
    }
}

impl ModelCaller for ProviderModelCaller {
    fn generate(&self, system_instruction: &str, user_prompt: &str) -> CoreResult<String> {
        let messages = vec![
            ChatMessage::system(system_instruction),
            ChatMessage::user(user_prompt),
        ];
        let response = self
            .runtime
            .block_on(self.provider.chat(&messages, Some(&self.options)))
            .map_err(|e| CoreError::ModelUnavailable {
                provider: self.label.clone(),
                detail: e.to_string(),
            })?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Resolve which provider to call.
///
/// Priority: explicit provider object, then `provider_name` (+ `model`),
/// then whatever `ProviderFactory::from_env` detects from API-key variables.
pub fn resolve_provider(config: &CoreConfig) -> CoreResult<Arc<dyn LLMProvider>> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model(name));
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            CoreError::ModelUnavailable {
                provider: name.clone(),
                detail: e.to_string(),
            }
        });
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| CoreError::ModelUnavailable {
            provider: "auto".to_string(),
            detail: format!(
                "No LLM provider could be auto-detected from environment. \
                 Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, \
                 or COURSEMIND_LLM_PROVIDER. Error: {e}"
            ),
        })?;
    Ok(llm_provider)
}

/// Model used when a provider is named without one.
fn default_model(provider: &str) -> &'static str {
    match provider {
        "gemini" | "google" => "gemini-2.5-flash",
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" => "llama3.1",
        _ => "gpt-4.1-mini",
    }
}

fn provider_label(config: &CoreConfig) -> String {
    match (&config.provider, &config.provider_name) {
        (Some(_), _) => "custom".to_string(),
        (None, Some(name)) => name.clone(),
        (None, None) => "auto".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_model_callers() {
        let echo = |s: &str, u: &str| -> CoreResult<String> { Ok(format!("{s}|{u}")) };
        assert_eq!(echo.generate("sys", "user").unwrap(), "sys|user");
    }

    #[test]
    fn caller_errors_pass_through() {
        let down = |_: &str, _: &str| -> CoreResult<String> {
            Err(CoreError::ModelUnavailable {
                provider: "test".into(),
                detail: "quota".into(),
            })
        };
        assert!(matches!(
            down.generate("", ""),
            Err(CoreError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn default_models_per_provider() {
        assert_eq!(default_model("gemini"), "gemini-2.5-flash");
        assert_eq!(default_model("openai"), "gpt-4.1-mini");
    }

    #[test]
    fn labels_follow_resolution_order() {
        let mut c = CoreConfig::default();
        assert_eq!(provider_label(&c), "auto");
        c.provider_name = Some("gemini".into());
        assert_eq!(provider_label(&c), "gemini");
    }
}
