//! Session memory: token counting, per-session persistence, and
//! threshold-triggered summarization.

pub mod service;
pub mod store;
pub mod summarize;
pub mod tokens;

pub use service::MemoryService;
pub use store::SessionStore;
pub use summarize::{Summarizer, SUMMARY_SYSTEM_PROMPT};
pub use tokens::TokenCounter;
