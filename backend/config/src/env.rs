//! Environment variable overrides applied on top of file/default config.

use std::collections::HashMap;

use crate::schema::MnemoConfig;

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut MnemoConfig) {
    apply_overrides_from(config, &std::env::vars().collect());
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_overrides_from(config: &mut MnemoConfig, env: &HashMap<String, String>) {
    let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

    if let Some(v) = get("MNEMO_BIND") {
        config.server.bind_address = v;
    }
    if let Some(v) = get("MNEMO_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = v;
    }
    if let Some(v) = get("MNEMO_PROVIDER") {
        config.llm.provider = v;
    }
    if let Some(v) = get("MNEMO_MODEL") {
        config.llm.model = v;
    }
    if let Some(v) = get("OPENAI_API_KEY") {
        config.llm.openai_api_key = Some(v);
    }
    if let Some(v) = get("OPENAI_BASE_URL") {
        config.llm.openai_base_url = Some(v);
    }
    if let Some(v) = get("OLLAMA_URL") {
        config.llm.ollama_url = v;
    }
    if let Some(v) = get("MNEMO_TOKEN_THRESHOLD").and_then(|v| v.parse().ok()) {
        config.memory.token_threshold = v;
    }
    if let Some(v) = get("MNEMO_RECENT_MESSAGES").and_then(|v| v.parse().ok()) {
        config.memory.recent_messages_count = v;
    }
    if let Some(v) = get("MNEMO_TOKENIZER") {
        config.memory.tokenizer = v;
    }
    if let Some(v) = get("MNEMO_MEMORY_DIR") {
        config.memory.dir = v.into();
    }
    if let Some(v) = get("RUST_LOG") {
        config.logging.level = v;
    }
    if let Some(v) = get("MNEMO_LOG_DIR") {
        config.logging.log_dir = Some(v.into());
    }
}
