//! Threshold-triggered conversation summarization.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mnemo_core::{
    render_transcript, LlmProvider, LlmRequest, MessageRange, SchemaSpec, SessionMemory,
    SessionSummary,
};

use crate::tokens::TokenCounter;

/// System instruction for the structured summary call.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a conversation summarizer. Analyze the conversation and extract:
1. User profile: preferences and constraints mentioned
2. Key facts: important information discussed
3. Decisions: any decisions made
4. Open questions: unresolved questions
5. Todos: action items mentioned

Be concise and focus on information that would be useful for future context.";

/// Turns an over-threshold transcript into a structured summary plus a short
/// recent-message tail.
///
/// A failed or non-conforming model response leaves the memory unmodified;
/// the threshold re-triggers on the next appended message.
pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    tokens: Arc<TokenCounter>,
    keep_recent: usize,
    max_tokens: u32,
    temperature: f32,
}

impl Summarizer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        tokens: Arc<TokenCounter>,
        keep_recent: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            tokens,
            keep_recent,
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Summarize the current transcript in place.
    ///
    /// Returns whether a new summary was installed. Empty transcripts and
    /// failed model calls are no-ops.
    pub async fn summarize(&self, memory: &mut SessionMemory) -> bool {
        if memory.messages.is_empty() {
            return false;
        }

        info!(
            session_id = %memory.session_id,
            total_tokens = memory.total_tokens,
            "Summarizing session"
        );

        let summary = match self.request_summary(&memory.messages).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    session_id = %memory.session_id,
                    error = %e,
                    "Summarization failed, keeping transcript"
                );
                return false;
            }
        };

        // Full replacement, never a merge with the previous summary.
        let summarized_len = memory.messages.len();
        memory.summary = Some(summary);
        memory.message_range_summarized = Some(MessageRange {
            from: 0,
            to: summarized_len - 1,
        });

        if summarized_len > self.keep_recent {
            memory.messages.drain(..summarized_len - self.keep_recent);
        }
        memory.total_tokens = self.tokens.count_messages(&memory.messages);

        info!(
            session_id = %memory.session_id,
            kept_messages = memory.messages.len(),
            total_tokens = memory.total_tokens,
            "Summarization complete"
        );
        true
    }

    async fn request_summary(
        &self,
        messages: &[mnemo_core::Message],
    ) -> Result<SessionSummary> {
        let transcript = render_transcript(messages);
        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: SUMMARY_SYSTEM_PROMPT.to_string(),
            user_prompt: format!("Summarize this conversation:\n\n{transcript}"),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let schema = SchemaSpec::new("session_summary", SessionSummary::response_schema());

        let value = self.provider.complete_structured(&request, &schema).await?;
        serde_json::from_value(value).context("model returned a non-conforming summary")
    }
}
