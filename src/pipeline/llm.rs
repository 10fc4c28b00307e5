//! Language-model interaction: one JSON-mode chat completion.
//!
//! [`CompletionBackend`] is the seam to the hosted model. The orchestrator
//! hands it a fully built [`CompletionRequest`] and expects the raw response
//! text back; parsing and schema checks happen in [`crate::extract`] so the
//! raw text is still available when they fail.
//!
//! [`OpenAiBackend`] implements the seam with `edgequake-llm`'s OpenAI
//! provider. A provider is built per request from the request's key, since
//! the key may be supplied after the session starts.

use crate::error::MealPlanError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, OpenAIProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Name used in errors and logs for the language-model service.
pub const LLM_SERVICE: &str = "OpenAI";

/// One structured-extraction call.
#[derive(Clone, PartialEq)]
pub struct CompletionRequest {
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("user_prompt_len", &self.user_prompt.len())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Returns the model's text for a JSON-object-mode request.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<String, MealPlanError>;
}

/// OpenAI chat completions via `edgequake-llm`.
#[derive(Debug, Clone, Default)]
pub struct OpenAiBackend;

impl OpenAiBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<String, MealPlanError> {
        let start = Instant::now();
        let provider: Arc<dyn LLMProvider> = Arc::new(
            OpenAIProvider::new(request.api_key.as_str()).with_model(request.model.as_str()),
        );

        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user(request.user_prompt.as_str()),
        ];
        let options = build_options(request);

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    request.model,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!("{} call failed: {}", request.model, e);
                Err(MealPlanError::upstream(LLM_SERVICE, e))
            }
        }
    }
}

/// Deterministic, bounded, JSON-object mode.
fn build_options(request: &CompletionRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        response_format: Some("json_object".to_string()),
        ..Default::default()
    }
}
