//! Runtime wiring: build the pipeline from configuration.
//!
//! All components are explicitly constructed and injected here; nothing in
//! the system is a process-wide singleton.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use mnemo_config::{LlmConfig, MnemoConfig};
use mnemo_llm::{MockProvider, OllamaProvider, OpenAiProvider, ProviderRegistry};
use mnemo_memory::{MemoryService, SessionStore, Summarizer, TokenCounter};
use mnemo_understanding::QueryEngine;

use crate::pipeline::ChatPipeline;

/// Build a ready-to-run pipeline from the effective configuration.
pub fn build_pipeline(config: &MnemoConfig) -> Result<Arc<ChatPipeline>> {
    let tokens = Arc::new(
        TokenCounter::new(&config.memory.tokenizer).context("failed to build token counter")?,
    );
    let store = SessionStore::new(&config.memory.dir)?;
    let memory = Arc::new(MemoryService::new(
        store,
        Arc::clone(&tokens),
        config.memory.token_threshold,
        config.memory.recent_messages_count,
    ));

    let registry = build_registry(&config.llm);
    let provider = registry.get(&config.llm.provider).with_context(|| {
        format!(
            "llm provider '{}' is not available (known: {:?})",
            config.llm.provider,
            registry.list()
        )
    })?;

    let summarizer = Summarizer::new(
        Arc::clone(&provider),
        config.llm.model.clone(),
        Arc::clone(&tokens),
        config.memory.recent_messages_count,
    );
    let query_engine = QueryEngine::new(
        Arc::clone(&provider),
        Arc::clone(&memory),
        config.llm.model.clone(),
    );

    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        token_threshold = config.memory.token_threshold,
        "Pipeline built"
    );

    Ok(Arc::new(
        ChatPipeline::new(
            memory,
            summarizer,
            query_engine,
            provider,
            config.llm.model.clone(),
            config.error_message.clone(),
        )
        .with_sampling(config.llm.max_tokens, config.llm.temperature),
    ))
}

/// Register every provider the configuration can reach.
fn build_registry(llm: &LlmConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    if let Some(api_key) = &llm.openai_api_key {
        let mut provider = OpenAiProvider::new(api_key);
        if let Some(base_url) = &llm.openai_base_url {
            provider = provider.with_base_url(base_url);
        }
        registry.register("openai", Arc::new(provider));
    }

    registry.register(
        "ollama",
        Arc::new(OllamaProvider::new().with_base_url(&llm.ollama_url)),
    );
    registry.register(
        "mock",
        Arc::new(MockProvider::new("mock").with_response("Mock response")),
    );

    registry
}
