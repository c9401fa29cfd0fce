//! Memory service: the mutation and query operations over session memory.

use std::sync::Arc;

use anyhow::Result;

use mnemo_core::{Message, SessionMemory};

use crate::store::SessionStore;
use crate::tokens::TokenCounter;

/// Session-memory operations shared by the pipeline and the HTTP surface.
///
/// Mutations are pure with respect to persistence: callers decide when to
/// `save`.
pub struct MemoryService {
    store: SessionStore,
    tokens: Arc<TokenCounter>,
    token_threshold: usize,
    recent_messages_count: usize,
}

impl MemoryService {
    pub fn new(
        store: SessionStore,
        tokens: Arc<TokenCounter>,
        token_threshold: usize,
        recent_messages_count: usize,
    ) -> Self {
        Self {
            store,
            tokens,
            token_threshold,
            recent_messages_count,
        }
    }

    pub fn token_counter(&self) -> &Arc<TokenCounter> {
        &self.tokens
    }

    pub fn token_threshold(&self) -> usize {
        self.token_threshold
    }

    pub async fn load(&self, session_id: &str) -> SessionMemory {
        self.store.load(session_id).await
    }

    pub async fn save(&self, memory: &mut SessionMemory) -> Result<()> {
        self.store.save(memory).await
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.store.delete(session_id).await
    }

    /// Append a message, recomputing `total_tokens` over the entire current
    /// message list (full recount, never incremental).
    pub fn add_message(&self, memory: &mut SessionMemory, message: Message) {
        memory.messages.push(message);
        memory.total_tokens = self.tokens.count_messages(&memory.messages);
    }

    /// Whether the accumulated tokens exceed the threshold (strict `>`).
    pub fn should_summarize(&self, memory: &SessionMemory) -> bool {
        memory.total_tokens > self.token_threshold
    }

    /// Last `count` messages (all, if fewer exist). `None` means the
    /// configured retention count.
    pub fn recent_messages<'a>(
        &self,
        memory: &'a SessionMemory,
        count: Option<usize>,
    ) -> &'a [Message] {
        let count = count.unwrap_or(self.recent_messages_count);
        let len = memory.messages.len();
        &memory.messages[len.saturating_sub(count)..]
    }

    /// Render the summary fields named by dotted paths as context lines.
    ///
    /// Unknown paths and empty fields are silently skipped; each resolved
    /// field renders as `<path>: a, b, c`, lines newline-joined.
    pub fn context_from_summary(&self, memory: &SessionMemory, fields: &[String]) -> String {
        let Some(summary) = &memory.summary else {
            return String::new();
        };

        let mut lines = Vec::new();
        for field in fields {
            if let Some(values) = summary.field_by_path(field) {
                if !values.is_empty() {
                    lines.push(format!("{field}: {}", values.join(", ")));
                }
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::{SessionSummary, UserProfile};

    fn service_with_threshold(threshold: usize) -> MemoryService {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let tokens = Arc::new(TokenCounter::new("o200k_base").unwrap());
        MemoryService::new(store, tokens, threshold, 5)
    }

    #[test]
    fn test_total_tokens_never_drifts() {
        let service = service_with_threshold(1000);
        let mut memory = SessionMemory::new("drift");

        for i in 0..20 {
            service.add_message(&mut memory, Message::user(format!("message number {i}")));
            assert_eq!(
                memory.total_tokens,
                service.token_counter().count_messages(&memory.messages)
            );
        }
    }

    #[test]
    fn test_should_summarize_strictly_greater() {
        let service = service_with_threshold(1000);
        let mut memory = SessionMemory::new("exact");
        service.add_message(&mut memory, Message::user("some opening message"));

        // At exactly the threshold: no trigger. One above: trigger.
        let at = MemoryService::new(
            SessionStore::new(tempfile::tempdir().unwrap().path()).unwrap(),
            Arc::clone(service.token_counter()),
            memory.total_tokens,
            5,
        );
        assert!(!at.should_summarize(&memory));

        let below = MemoryService::new(
            SessionStore::new(tempfile::tempdir().unwrap().path()).unwrap(),
            Arc::clone(service.token_counter()),
            memory.total_tokens - 1,
            5,
        );
        assert!(below.should_summarize(&memory));
    }

    #[test]
    fn test_should_summarize_does_not_mutate() {
        let service = service_with_threshold(1);
        let mut memory = SessionMemory::new("idempotent");
        service.add_message(&mut memory, Message::user("a reasonably long message"));
        let snapshot = memory.clone();

        for _ in 0..3 {
            assert!(service.should_summarize(&memory));
        }
        assert_eq!(memory, snapshot);
    }

    #[test]
    fn test_recent_messages_bounds() {
        let service = service_with_threshold(1000);
        let mut memory = SessionMemory::new("recent");
        for i in 0..8 {
            service.add_message(&mut memory, Message::user(format!("m{i}")));
        }

        let recent = service.recent_messages(&memory, None);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].content, "m3");
        assert_eq!(recent[4].content, "m7");

        assert_eq!(service.recent_messages(&memory, Some(100)).len(), 8);
        assert_eq!(service.recent_messages(&memory, Some(2)).len(), 2);
    }

    #[test]
    fn test_recent_messages_empty_memory() {
        let service = service_with_threshold(1000);
        let memory = SessionMemory::new("empty");
        assert!(service.recent_messages(&memory, None).is_empty());
    }

    fn summarized_memory() -> SessionMemory {
        let mut memory = SessionMemory::new("ctx");
        memory.summary = Some(SessionSummary {
            user_profile: UserProfile {
                preferences: vec!["Linux".into(), "ThinkPad".into()],
                constraints: vec![],
            },
            key_facts: vec!["budget is $1500".into()],
            decisions: vec![],
            open_questions: vec!["battery life?".into()],
            todos: vec![],
        });
        memory
    }

    #[test]
    fn test_context_from_summary_renders_lists() {
        let service = service_with_threshold(1000);
        let memory = summarized_memory();

        let context = service.context_from_summary(
            &memory,
            &["user_profile.preferences".into(), "key_facts".into()],
        );
        assert_eq!(
            context,
            "user_profile.preferences: Linux, ThinkPad\nkey_facts: budget is $1500"
        );
    }

    #[test]
    fn test_context_from_summary_skips_unknown_and_empty() {
        let service = service_with_threshold(1000);
        let memory = summarized_memory();

        let context = service.context_from_summary(
            &memory,
            &[
                "decisions".into(),          // empty list
                "no.such.path".into(),       // unknown
                "open_questions".into(),
            ],
        );
        assert_eq!(context, "open_questions: battery life?");
    }

    #[test]
    fn test_context_from_summary_without_summary() {
        let service = service_with_threshold(1000);
        let memory = SessionMemory::new("nosummary");
        assert_eq!(
            service.context_from_summary(&memory, &["key_facts".into()]),
            ""
        );
    }
}
