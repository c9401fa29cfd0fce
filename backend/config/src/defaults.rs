//! Default configuration values.

/// HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// HTTP server port.
pub const DEFAULT_PORT: u16 = 8000;

/// API version segment in route paths.
pub const DEFAULT_API_VERSION: &str = "v0";

/// LLM provider used when none is configured.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Completion model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Ollama base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Max completion tokens per model call.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Sampling temperature for answer generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Token count above which summarization triggers (strict greater-than).
pub const DEFAULT_TOKEN_THRESHOLD: usize = 1000;

/// Number of recent messages kept after summarization and used for context.
pub const DEFAULT_RECENT_MESSAGES_COUNT: usize = 5;

/// Tokenizer encoding used for token counting.
pub const DEFAULT_TOKENIZER: &str = "o200k_base";

/// Directory holding one JSON file per session.
pub const DEFAULT_MEMORY_DIR: &str = "data/memory";

/// Log level when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// User-visible answer substituted when answer generation fails.
pub const ERROR_MESSAGE: &str = "We are facing an issue, please try again later.";
