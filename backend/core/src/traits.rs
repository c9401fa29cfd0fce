use anyhow::Result;
use async_trait::async_trait;

/// Trait for language-model providers.
///
/// Both call shapes are assumed to be remote, fallible, and latency-bearing;
/// callers own the recovery policy (no retries happen here).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Free-text completion for a system + user prompt.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Structured completion constrained to the given JSON Schema.
    ///
    /// Returns the parsed JSON value; the caller deserializes it into the
    /// target type and treats a mismatch as the same recoverable failure as
    /// a failed call.
    async fn complete_structured(
        &self,
        request: &LlmRequest,
        schema: &SchemaSpec,
    ) -> Result<serde_json::Value>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// A named JSON Schema target for structured completion.
#[derive(Debug, Clone)]
pub struct SchemaSpec {
    pub name: String,
    pub schema: serde_json::Value,
}

impl SchemaSpec {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}
