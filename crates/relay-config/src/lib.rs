#![allow(clippy::must_use_candidate)]

mod env;
pub mod error;
pub mod llm;
mod loader;
pub mod logging;
pub mod models;
pub mod server;

use serde::Deserialize;

pub use error::ConfigError;
pub use llm::*;
pub use logging::*;
pub use server::*;

/// Top-level Relay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
