//! Provider-agnostic chat completion routing for Relay
//!
//! Resolves a logical model name to one configured backend, translates the
//! canonical request into that backend's dialect (signing it when
//! required), and normalizes responses and event streams back into the
//! canonical shape.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod dialect;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
#[cfg(feature = "server")]
pub mod router;
pub mod signing;
pub mod sse;
pub mod types;

pub use error::LlmError;
pub use provider::{ChatStream, GatewayProvider, HttpProviderFactory, Provider, ProviderFactory};
pub use registry::{BackendFailure, LazyRegistry, Registry};
#[cfg(feature = "server")]
pub use router::{LlmState, llm_router};
pub use types::{ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, Message, Role};
