use thiserror::Error;

/// Top-level error type for the Mnemo backend.
#[derive(Debug, Error)]
pub enum MnemoError {
    #[error("LLM provider error ({provider}): {message}")]
    LlmError { provider: String, message: String },

    #[error("model returned a non-conforming structured response: {0}")]
    MalformedResponse(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
