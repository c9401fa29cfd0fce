//! LLM providers: OpenAI-compatible, Ollama, and a mock for tests and
//! offline runs, looked up by name in a registry.

pub mod providers;

pub use providers::mock::MockProvider;
pub use providers::ollama::OllamaProvider;
pub use providers::openai::OpenAiProvider;
pub use providers::ProviderRegistry;
