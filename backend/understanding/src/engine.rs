//! The query understanding engine.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mnemo_core::{
    render_transcript, LlmProvider, LlmRequest, QueryUnderstanding, SchemaSpec, SessionMemory,
};
use mnemo_memory::MemoryService;

use crate::context::{build_final_context, summary_digest, NO_RECENT_MESSAGES};

/// System instruction for the structured analysis call.
pub const QUERY_SYSTEM_PROMPT: &str = "You are a query understanding assistant. Analyze the user's query and:

1. Determine if the query is ambiguous (missing context, unclear intent, vague references)
2. If ambiguous, rewrite it to be clearer based on available context
3. Identify which parts of session memory would help answer the query
4. If the query is still unclear after rewriting, generate 1-3 clarifying questions

Be concise. Focus on understanding user intent.";

/// Judges ambiguity, optionally rewrites the query, and assembles the final
/// augmented context from recent messages, selected summary fields, and the
/// effective query.
pub struct QueryEngine {
    provider: Arc<dyn LlmProvider>,
    memory: Arc<MemoryService>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl QueryEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        memory: Arc<MemoryService>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            memory,
            model: model.into(),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Understand a query against the current session memory.
    ///
    /// Never fails: a failed or unusable model response degrades to a
    /// minimal context built from the recent transcript and the original
    /// query, skipping the summary entirely.
    pub async fn understand(&self, query: &str, memory: &SessionMemory) -> QueryUnderstanding {
        let recent = self.memory.recent_messages(memory, None);
        let recent_text = if recent.is_empty() {
            NO_RECENT_MESSAGES.to_string()
        } else {
            render_transcript(recent)
        };
        let digest = memory
            .summary
            .as_ref()
            .map(summary_digest)
            .unwrap_or_default();

        match self.analyze(query, &recent_text, &digest).await {
            Ok(mut understanding) => {
                // The model is not trusted to echo the query back.
                understanding.original_query = query.to_string();

                let memory_context = if understanding.needed_context_from_memory.is_empty() {
                    String::new()
                } else {
                    self.memory
                        .context_from_summary(memory, &understanding.needed_context_from_memory)
                };

                let effective_query = if understanding.is_ambiguous {
                    understanding.rewritten_query.as_deref().unwrap_or(query)
                } else {
                    query
                };

                understanding.final_augmented_context = build_final_context(
                    (!recent.is_empty()).then_some(recent_text.as_str()),
                    (!memory_context.is_empty()).then_some(memory_context.as_str()),
                    effective_query,
                );

                info!(
                    session_id = %memory.session_id,
                    is_ambiguous = understanding.is_ambiguous,
                    "Query understanding complete"
                );
                understanding
            }
            Err(e) => {
                warn!(
                    session_id = %memory.session_id,
                    error = %e,
                    "Query understanding failed, using fallback context"
                );
                QueryUnderstanding {
                    original_query: query.to_string(),
                    is_ambiguous: false,
                    rewritten_query: None,
                    needed_context_from_memory: Vec::new(),
                    clarifying_questions: Vec::new(),
                    final_augmented_context: format!(
                        "Recent conversation:\n{recent_text}\n\nUser query: {query}"
                    ),
                }
            }
        }
    }

    async fn analyze(
        &self,
        query: &str,
        recent_text: &str,
        digest: &str,
    ) -> Result<QueryUnderstanding> {
        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: QUERY_SYSTEM_PROMPT.to_string(),
            user_prompt: format!(
                "Analyze this query:\n\n\
                 Query: {query}\n\n\
                 Recent conversation:\n{recent_text}\n\n\
                 {digest}\n\n\
                 Provide your analysis as structured output."
            ),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let schema = SchemaSpec::new("query_analysis", QueryUnderstanding::analysis_schema());

        let value = self.provider.complete_structured(&request, &schema).await?;
        serde_json::from_value(value).context("model returned a non-conforming analysis")
    }
}
