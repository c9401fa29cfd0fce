//! Pipeline orchestration: sequences memory, summarization, query
//! understanding, and answer generation for each incoming query.

pub mod pipeline;
pub mod runtime;
pub mod session_locks;

pub use pipeline::{ChatPipeline, ANSWER_SYSTEM_PROMPT};
pub use runtime::build_pipeline;
pub use session_locks::SessionLocks;
