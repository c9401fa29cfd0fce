//! Deterministic token counting bound to the configured model family.

use anyhow::{bail, Result};
use tiktoken_rs::CoreBPE;

use mnemo_core::Message;

/// Counts tokens with a fixed tiktoken encoding.
///
/// Construction resolves the encoding once; counting itself has no error
/// conditions. Shared across services behind an `Arc`.
pub struct TokenCounter {
    bpe: CoreBPE,
    encoding: String,
}

impl TokenCounter {
    /// Build a counter for a named encoding ("o200k_base" or "cl100k_base").
    pub fn new(encoding: &str) -> Result<Self> {
        let bpe = match encoding {
            "o200k_base" => tiktoken_rs::o200k_base()?,
            "cl100k_base" => tiktoken_rs::cl100k_base()?,
            other => bail!("unknown tokenizer encoding '{other}'"),
        };
        Ok(Self {
            bpe,
            encoding: encoding.to_string(),
        })
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Token count of a text fragment.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Total token count over `"<role>: <content>"` renderings.
    pub fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count(&m.render())).sum()
    }
}
