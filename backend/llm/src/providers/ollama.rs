use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mnemo_core::{LlmProvider, LlmRequest, LlmResponse, SchemaSpec};

/// Ollama local LLM provider.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn send(&self, body: &OllamaChatRequest) -> Result<OllamaChatResponse> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(body)
            .send()
            .await
            .context("Ollama HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama returned {}: {}", status, error_body);
        }

        response
            .json()
            .await
            .context("Failed to parse Ollama response")
    }

    fn build_request(request: &LlmRequest, format: Option<serde_json::Value>) -> OllamaChatRequest {
        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(OllamaChatMessage {
                role: "system".to_string(),
                content: request.system_prompt.clone(),
            });
        }
        messages.push(OllamaChatMessage {
            role: "user".to_string(),
            content: request.user_prompt.clone(),
        });

        // Strip any provider prefix like "openai/" from the model name.
        let model = request
            .model
            .split('/')
            .next_back()
            .unwrap_or(&request.model)
            .to_string();

        OllamaChatRequest {
            model,
            messages,
            stream: false,
            format,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaChatMessage>,
    stream: bool,
    /// JSON Schema constraining the response, for structured calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize, Deserialize)]
struct OllamaChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
    eval_count: Option<u64>,
    prompt_eval_count: Option<u64>,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let body = Self::build_request(request, None);

        debug!(model = %body.model, "Sending completion request to Ollama");
        let chat_response = self.send(&body).await?;

        let tokens_used =
            chat_response.eval_count.unwrap_or(0) + chat_response.prompt_eval_count.unwrap_or(0);

        Ok(LlmResponse {
            content: chat_response.message.content,
            provider: "ollama".to_string(),
            model: body.model,
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn complete_structured(
        &self,
        request: &LlmRequest,
        schema: &SchemaSpec,
    ) -> Result<serde_json::Value> {
        let body = Self::build_request(request, Some(schema.schema.clone()));

        debug!(
            model = %body.model,
            schema = %schema.name,
            "Sending structured request to Ollama"
        );
        let chat_response = self.send(&body).await?;

        serde_json::from_str(&chat_response.message.content)
            .context("Ollama structured output is not valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LlmRequest {
        LlmRequest {
            model: "openai/gpt-4.1-mini".into(),
            system_prompt: "be terse".into(),
            user_prompt: "hello".into(),
            max_tokens: 128,
            temperature: 0.5,
        }
    }

    #[test]
    fn test_model_prefix_stripped() {
        let body = OllamaProvider::build_request(&request(), None);
        assert_eq!(body.model, "gpt-4.1-mini");
    }

    #[test]
    fn test_format_included_only_for_structured() {
        let plain = OllamaProvider::build_request(&request(), None);
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("format").is_none());

        let structured =
            OllamaProvider::build_request(&request(), Some(serde_json::json!({"type": "object"})));
        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["format"]["type"], "object");
    }
}
