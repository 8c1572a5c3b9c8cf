//! Cover-text generation: one best-effort call to a text model.
//!
//! The assembler never depends on this succeeding. A failed, timed-out or
//! empty response is replaced by [`FALLBACK_COVER_TEXT`], and the cover is
//! rendered with that instead. There are no retries: the caller asked for
//! one cover, not for a wait.
//!
//! The model sits behind [`TextGenerator`] so tests (and callers with their
//! own text source) can swap it out.

use crate::config::AssemblyConfig;
use crate::pipeline::postprocess::clean_cover_text;
use crate::prompts::{cover_user_prompt, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Printed on the cover when no text could be generated.
pub const FALLBACK_COVER_TEXT: &str = "Could not generate the cover text.";

/// Anything that can turn a short description into cover body text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, String>;
}

/// [`TextGenerator`] backed by an `edgequake-llm` provider.
pub struct LlmTextGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmTextGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AssemblyConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmTextGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String, String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| e.to_string())?;
        debug!(
            "Cover text: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the assembly config.
fn build_options(config: &AssemblyConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Ask `generator` once for cover text about `description`.
///
/// Always returns usable text: the cleaned response, or
/// [`FALLBACK_COVER_TEXT`] if the call fails, times out or yields nothing.
pub async fn generate_cover_text(
    generator: &dyn TextGenerator,
    title: &str,
    description: &str,
    config: &AssemblyConfig,
) -> String {
    let start = Instant::now();
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let user = cover_user_prompt(title, description);
    let limit = Duration::from_secs(config.api_timeout_secs);

    let text = match timeout(limit, generator.generate(system, &user)).await {
        Ok(Ok(raw)) => clean_cover_text(&raw),
        Ok(Err(e)) => {
            warn!("Cover text generation failed: {e}");
            String::new()
        }
        Err(_) => {
            warn!("Cover text generation timed out after {}s", config.api_timeout_secs);
            String::new()
        }
    };

    if text.is_empty() {
        return FALLBACK_COVER_TEXT.to_string();
    }
    debug!("Cover text: {} chars in {:?}", text.len(), start.elapsed());
    text
}
