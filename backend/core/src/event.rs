use serde::{Deserialize, Serialize};

use crate::types::{QueryUnderstanding, SessionSummary};

/// Progress and result events emitted by one pipeline run.
///
/// A run produces a finite, ordered sequence of these, terminating after
/// exactly one `Answer`. Serialized as `{"type": ..., "content": ...}` so a
/// consumer can switch on the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Advisory progress marker for the current pipeline stage.
    PipelineStep(String),
    /// A freshly produced session summary.
    Summary(SessionSummary),
    /// The query understanding result for this run.
    QueryUnderstanding(QueryUnderstanding),
    /// Clarifying questions, emitted only when the analysis produced any.
    ClarifyingQuestions(Vec<String>),
    /// Terminal answer (success or degraded-error text).
    Answer(String),
}

impl PipelineEvent {
    /// Whether this event terminates the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Answer(_))
    }
}
