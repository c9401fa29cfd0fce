pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use error::MnemoError;
pub use event::PipelineEvent;
pub use message::{render_transcript, Message, Role};
pub use traits::{LlmProvider, LlmRequest, LlmResponse, SchemaSpec};
pub use types::{
    ChatRequest, MessageRange, QueryUnderstanding, SessionMemory, SessionSummary, UserProfile,
};
