//! The per-query chat pipeline.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use mnemo_core::{ChatRequest, LlmProvider, LlmRequest, Message, PipelineEvent};
use mnemo_memory::{MemoryService, Summarizer};
use mnemo_understanding::QueryEngine;

use crate::session_locks::SessionLocks;

/// Fixed system instruction for answer generation.
pub const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful chat assistant. Use the provided context to answer the user's question.
If the query was rewritten for clarity, use the rewritten version.
Be concise and helpful.";

const EVENT_BUFFER_SIZE: usize = 32;

/// Sequences one pipeline run per incoming query:
/// load memory → merge messages → maybe summarize → understand query →
/// generate answer → persist, emitting a progress event per stage and
/// terminating in exactly one answer event.
pub struct ChatPipeline {
    memory: Arc<MemoryService>,
    summarizer: Summarizer,
    query_engine: QueryEngine,
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    error_message: String,
    locks: SessionLocks,
}

impl std::fmt::Debug for ChatPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPipeline")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl ChatPipeline {
    pub fn new(
        memory: Arc<MemoryService>,
        summarizer: Summarizer,
        query_engine: QueryEngine,
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            memory,
            summarizer,
            query_engine,
            provider,
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.7,
            error_message: error_message.into(),
            locks: SessionLocks::new(),
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn memory(&self) -> &Arc<MemoryService> {
        &self.memory
    }

    /// Run the pipeline for one request, emitting events on `tx`.
    ///
    /// Never fails: any escaped error becomes the terminal answer event. A
    /// dropped receiver does not abort the run; memory is still persisted.
    #[instrument(skip(self, request, tx), fields(session_id = %request.session_id))]
    pub async fn process(&self, request: ChatRequest, tx: mpsc::Sender<PipelineEvent>) {
        let _guard = self.locks.acquire(&request.session_id).await;

        if let Err(e) = self.run(request, &tx).await {
            error!(error = %e, "Pipeline run failed");
            send(&tx, PipelineEvent::Answer(format!("Sorry, an error occurred: {e}"))).await;
        }
    }

    /// Spawn a run on the runtime, returning the event stream.
    pub fn spawn(self: Arc<Self>, request: ChatRequest) -> mpsc::Receiver<PipelineEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        tokio::spawn(async move {
            self.process(request, tx).await;
        });
        rx
    }

    async fn run(&self, request: ChatRequest, tx: &mpsc::Sender<PipelineEvent>) -> Result<()> {
        send(tx, PipelineEvent::PipelineStep("Loading session memory...".into())).await;
        let mut memory = self.memory.load(&request.session_id).await;

        // Merge any supplied prior messages the record does not already hold.
        for message in request.messages {
            if !memory.messages.contains(&message) {
                self.memory.add_message(&mut memory, message);
            }
        }
        self.memory.add_message(&mut memory, Message::user(&request.query));

        send(
            tx,
            PipelineEvent::PipelineStep(format!(
                "Token count: {}/{}",
                memory.total_tokens,
                self.memory.token_threshold()
            )),
        )
        .await;

        if self.memory.should_summarize(&memory) {
            send(
                tx,
                PipelineEvent::PipelineStep(
                    "Token threshold exceeded, triggering summarization...".into(),
                ),
            )
            .await;

            // Emit only a freshly produced summary, never a stale one left
            // over from a failed re-summarization.
            if self.summarizer.summarize(&mut memory).await {
                if let Some(summary) = &memory.summary {
                    send(tx, PipelineEvent::Summary(summary.clone())).await;
                }
            }
        }

        send(tx, PipelineEvent::PipelineStep("Analyzing query...".into())).await;
        // Understanding runs on the literal query string, not the appended
        // message copy.
        let understanding = self.query_engine.understand(&request.query, &memory).await;
        send(tx, PipelineEvent::QueryUnderstanding(understanding.clone())).await;

        if !understanding.clarifying_questions.is_empty() {
            send(
                tx,
                PipelineEvent::ClarifyingQuestions(understanding.clarifying_questions.clone()),
            )
            .await;
        }

        send(tx, PipelineEvent::PipelineStep("Generating response...".into())).await;
        let answer = self.generate_answer(&understanding.final_augmented_context).await;

        self.memory.add_message(&mut memory, Message::assistant(&answer));
        self.memory.save(&mut memory).await?;

        info!(total_tokens = memory.total_tokens, "Pipeline run complete");
        send(tx, PipelineEvent::Answer(answer)).await;
        Ok(())
    }

    async fn generate_answer(&self, augmented_context: &str) -> String {
        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: ANSWER_SYSTEM_PROMPT.to_string(),
            user_prompt: augmented_context.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        match self.provider.complete(&request).await {
            Ok(response) => response.content,
            Err(e) => {
                error!(error = %e, "Answer generation failed");
                self.error_message.clone()
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) {
    if tx.send(event).await.is_err() {
        debug!("Event receiver dropped, continuing run");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_llm::MockProvider;
    use mnemo_memory::{SessionStore, TokenCounter};
    use serde_json::json;
    use tempfile::TempDir;

    const ERROR_MESSAGE: &str = "We are facing an issue, please try again later.";

    fn summary_json() -> serde_json::Value {
        json!({
            "user_profile": {"preferences": ["Linux"], "constraints": ["budget $1500"]},
            "key_facts": ["wants a programming laptop"],
            "decisions": [],
            "open_questions": [],
            "todos": []
        })
    }

    fn analysis_json() -> serde_json::Value {
        json!({
            "is_ambiguous": false,
            "rewritten_query": null,
            "needed_context_from_memory": [],
            "clarifying_questions": []
        })
    }

    fn pipeline_with(
        dir: &TempDir,
        token_threshold: usize,
        provider: MockProvider,
    ) -> Arc<ChatPipeline> {
        let provider: Arc<dyn LlmProvider> = Arc::new(provider);
        let tokens = Arc::new(TokenCounter::new("o200k_base").unwrap());
        let store = SessionStore::new(dir.path()).unwrap();
        let memory = Arc::new(MemoryService::new(store, Arc::clone(&tokens), token_threshold, 5));
        let summarizer =
            Summarizer::new(Arc::clone(&provider), "test-model", Arc::clone(&tokens), 5);
        let query_engine =
            QueryEngine::new(Arc::clone(&provider), Arc::clone(&memory), "test-model");
        Arc::new(ChatPipeline::new(
            memory,
            summarizer,
            query_engine,
            provider,
            "test-model",
            ERROR_MESSAGE,
        ))
    }

    async fn collect(mut rx: mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn long_prior_messages(count: usize) -> Vec<Message> {
        (0..count)
            .map(|i| {
                Message::user(format!(
                    "message {i}: I keep adding detail about the laptop I want to buy"
                ))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_run_ends_with_exactly_one_answer() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("the answer")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 1000, provider);

        let events = collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "hello".into(),
            session_id: "s1".into(),
            messages: vec![],
        }))
        .await;

        let answers: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Answer(_)))
            .collect();
        assert_eq!(answers.len(), 1);
        assert!(events.last().unwrap().is_terminal());
        match events.last().unwrap() {
            PipelineEvent::Answer(text) => assert_eq!(text, "the answer"),
            other => panic!("unexpected terminal event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_memory_persisted_with_both_turns() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("laptop advice")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 1000, provider);

        collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "recommend a laptop".into(),
            session_id: "persisted".into(),
            messages: vec![],
        }))
        .await;

        let memory = pipeline.memory().load("persisted").await;
        assert_eq!(memory.messages.len(), 2);
        assert_eq!(memory.messages[0].content, "recommend a laptop");
        assert_eq!(memory.messages[1].content, "laptop advice");
        assert_eq!(
            memory.total_tokens,
            pipeline.memory().token_counter().count_messages(&memory.messages)
        );
    }

    #[tokio::test]
    async fn test_threshold_crossing_summarizes_once() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("summary-backed answer")
            .with_structured_response_for("session_summary", summary_json())
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 200, provider);

        let events = collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "so which one should I get?".into(),
            session_id: "scenario-a".into(),
            messages: long_prior_messages(20),
        }))
        .await;

        let summaries: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Summary(_)))
            .collect();
        assert_eq!(summaries.len(), 1);

        let memory = pipeline.memory().load("scenario-a").await;
        let summary = memory.summary.as_ref().expect("summary must be persisted");
        assert_eq!(summary.user_profile.preferences, vec!["Linux"]);
        // 5 kept after summarization, plus the assistant answer appended after.
        assert_eq!(memory.messages.len(), 6);
        assert_eq!(memory.message_range_summarized.unwrap().to, 20);
    }

    #[tokio::test]
    async fn test_below_threshold_never_summarizes() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("fine")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 100_000, provider);

        let events = collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "short".into(),
            session_id: "quiet".into(),
            messages: long_prior_messages(3),
        }))
        .await;

        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Summary(_))));
        assert!(pipeline.memory().load("quiet").await.summary.is_none());
    }

    #[tokio::test]
    async fn test_failed_summarization_emits_no_summary_event() {
        let dir = tempfile::tempdir().unwrap();
        // No "session_summary" script: summarization fails, understanding and
        // answering still work.
        let provider = MockProvider::new("mock")
            .with_response("degraded but alive")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 200, provider);

        let events = collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "which laptop?".into(),
            session_id: "no-summary".into(),
            messages: long_prior_messages(20),
        }))
        .await;

        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Summary(_))));
        assert!(matches!(events.last().unwrap(), PipelineEvent::Answer(a) if a == "degraded but alive"));
        // Transcript kept; threshold will re-trigger on the next message.
        let memory = pipeline.memory().load("no-summary").await;
        assert!(memory.summary.is_none());
        assert_eq!(memory.messages.len(), 22);
    }

    #[tokio::test]
    async fn test_prior_messages_not_duplicated_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("ok")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 100_000, provider);

        let prior = long_prior_messages(4);
        for query in ["first question", "second question"] {
            collect(Arc::clone(&pipeline).spawn(ChatRequest {
                query: query.into(),
                session_id: "dedupe".into(),
                messages: prior.clone(),
            }))
            .await;
        }

        let memory = pipeline.memory().load("dedupe").await;
        // 4 prior + 2 queries + 2 answers, with no duplicated prior messages.
        assert_eq!(memory.messages.len(), 8);
    }

    #[tokio::test]
    async fn test_answer_failure_substitutes_error_message() {
        let dir = tempfile::tempdir().unwrap();
        // Understanding succeeds but free-text completion fails.
        let provider = MockProvider::new("mock")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 100_000, provider);

        let events = collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "hi".into(),
            session_id: "broken-llm".into(),
            messages: vec![],
        }))
        .await;

        assert!(matches!(events.last().unwrap(), PipelineEvent::Answer(a) if a == ERROR_MESSAGE));
        // The substituted answer is still persisted as the assistant turn.
        let memory = pipeline.memory().load("broken-llm").await;
        assert_eq!(memory.messages[1].content, ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_clarifying_questions_emitted_separately() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("need more info")
            .with_structured_response_for(
                "query_analysis",
                json!({
                    "is_ambiguous": true,
                    "rewritten_query": null,
                    "needed_context_from_memory": [],
                    "clarifying_questions": ["Which laptop do you mean?", "New or refurbished?"]
                }),
            );
        let pipeline = pipeline_with(&dir, 100_000, provider);

        let events = collect(Arc::clone(&pipeline).spawn(ChatRequest {
            query: "what about it?".into(),
            session_id: "clarify".into(),
            messages: vec![],
        }))
        .await;

        let questions = events.iter().find_map(|e| match e {
            PipelineEvent::ClarifyingQuestions(qs) => Some(qs.clone()),
            _ => None,
        });
        assert_eq!(questions.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_receiver_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("mock")
            .with_response("unseen answer")
            .with_structured_response_for("query_analysis", analysis_json());
        let pipeline = pipeline_with(&dir, 100_000, provider);

        let rx = Arc::clone(&pipeline).spawn(ChatRequest {
            query: "anyone listening?".into(),
            session_id: "dropped".into(),
            messages: vec![],
        });
        drop(rx);

        // The run continues without a consumer; wait for the save.
        for _ in 0..100 {
            if pipeline.memory().load("dropped").await.messages.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(pipeline.memory().load("dropped").await.messages.len(), 2);
    }
}
