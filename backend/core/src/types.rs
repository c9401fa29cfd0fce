use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::message::Message;

/// User preferences and constraints extracted from a conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Structured distillation of a conversation's older content.
///
/// Produced only by the summarization engine and treated as a replaceable
/// snapshot: a new summarization fully overwrites the previous one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    #[serde(default)]
    pub user_profile: UserProfile,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub todos: Vec<String>,
}

impl SessionSummary {
    /// Resolve a dotted field path against the summary.
    ///
    /// Only the known list-valued paths resolve; anything else is `None`.
    pub fn field_by_path(&self, path: &str) -> Option<&[String]> {
        match path {
            "user_profile.preferences" => Some(&self.user_profile.preferences),
            "user_profile.constraints" => Some(&self.user_profile.constraints),
            "key_facts" => Some(&self.key_facts),
            "decisions" => Some(&self.decisions),
            "open_questions" => Some(&self.open_questions),
            "todos" => Some(&self.todos),
            _ => None,
        }
    }

    /// All field paths that `field_by_path` recognizes.
    pub fn known_field_paths() -> &'static [&'static str] {
        &[
            "user_profile.preferences",
            "user_profile.constraints",
            "key_facts",
            "decisions",
            "open_questions",
            "todos",
        ]
    }

    /// JSON Schema for structured-output completion requests.
    pub fn response_schema() -> serde_json::Value {
        let string_list = || json!({"type": "array", "items": {"type": "string"}});
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "user_profile": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "preferences": string_list(),
                        "constraints": string_list(),
                    },
                    "required": ["preferences", "constraints"],
                },
                "key_facts": string_list(),
                "decisions": string_list(),
                "open_questions": string_list(),
                "todos": string_list(),
            },
            "required": ["user_profile", "key_facts", "decisions", "open_questions", "todos"],
        })
    }
}

/// Index range (into the pre-truncation message list) that produced the
/// current summary. Informational only; never re-validated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRange {
    pub from: usize,
    pub to: usize,
}

/// Complete per-session memory record, persisted as one file per session.
///
/// `messages` holds only the unsummarized tail of the conversation;
/// `total_tokens` is always the token count of exactly that list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMemory {
    pub session_id: String,
    #[serde(default)]
    pub summary: Option<SessionSummary>,
    #[serde(default)]
    pub message_range_summarized: Option<MessageRange>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub total_tokens: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionMemory {
    /// Fresh empty memory for a session id.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            summary: None,
            message_range_summarized: None,
            messages: Vec::new(),
            total_tokens: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of the query understanding pass. Ephemeral: produced fresh per
/// query, emitted as an event, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryUnderstanding {
    #[serde(default)]
    pub original_query: String,
    #[serde(default)]
    pub is_ambiguous: bool,
    #[serde(default)]
    pub rewritten_query: Option<String>,
    #[serde(default)]
    pub needed_context_from_memory: Vec<String>,
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
    #[serde(default)]
    pub final_augmented_context: String,
}

impl QueryUnderstanding {
    /// JSON Schema for the model-supplied portion of the analysis.
    ///
    /// `original_query` and `final_augmented_context` are intentionally
    /// absent: the first is overwritten with the literal input query and the
    /// second is assembled deterministically after the call.
    pub fn analysis_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "is_ambiguous": {"type": "boolean"},
                "rewritten_query": {"type": ["string", "null"]},
                "needed_context_from_memory": {
                    "type": "array",
                    "items": {"type": "string", "enum": SessionSummary::known_field_paths()},
                },
                "clarifying_questions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "maxItems": 3,
                },
            },
            "required": [
                "is_ambiguous",
                "rewritten_query",
                "needed_context_from_memory",
                "clarifying_questions",
            ],
        })
    }
}

/// Inbound chat request: one query against one session, with optional prior
/// messages to merge into memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}
