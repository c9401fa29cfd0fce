use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration for the Mnemo backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MnemoConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
    /// Answer substituted when answer generation fails.
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai", "ollama", or "mock".
    pub provider: String,
    pub model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub token_threshold: usize,
    pub recent_messages_count: usize,
    /// Tokenizer encoding name: "o200k_base" or "cl100k_base".
    pub tokenizer: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, NDJSON log files rotate daily in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for MnemoConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
            logging: LoggingConfig::default(),
            error_message: defaults::ERROR_MESSAGE.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::DEFAULT_BIND_ADDRESS.to_string(),
            port: defaults::DEFAULT_PORT,
            api_version: defaults::DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: defaults::DEFAULT_PROVIDER.to_string(),
            model: defaults::DEFAULT_MODEL.to_string(),
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: defaults::DEFAULT_OLLAMA_URL.to_string(),
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_threshold: defaults::DEFAULT_TOKEN_THRESHOLD,
            recent_messages_count: defaults::DEFAULT_RECENT_MESSAGES_COUNT,
            tokenizer: defaults::DEFAULT_TOKENIZER.to_string(),
            dir: PathBuf::from(defaults::DEFAULT_MEMORY_DIR),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
        }
    }
}

impl MnemoConfig {
    /// Reject configurations the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        match self.llm.provider.as_str() {
            "openai" | "ollama" | "mock" => {}
            other => bail!("unknown llm provider '{other}' (expected openai, ollama, or mock)"),
        }
        match self.memory.tokenizer.as_str() {
            "o200k_base" | "cl100k_base" => {}
            other => bail!("unknown tokenizer encoding '{other}'"),
        }
        if self.memory.token_threshold == 0 {
            bail!("memory.token_threshold must be positive");
        }
        if self.memory.recent_messages_count == 0 {
            bail!("memory.recent_messages_count must be positive");
        }
        Ok(())
    }
}
