//! Query understanding: ambiguity judgment, query rewriting, and
//! deterministic context augmentation against session memory.

pub mod context;
pub mod engine;

pub use context::{build_final_context, summary_digest, NO_RECENT_MESSAGES};
pub use engine::{QueryEngine, QUERY_SYSTEM_PROMPT};
