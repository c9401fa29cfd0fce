//! Mnemo runtime configuration: typed schema, code defaults, optional TOML
//! file, environment overrides.

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;

pub use io::load;
pub use schema::{LlmConfig, LoggingConfig, MemoryConfig, MnemoConfig, ServerConfig};
