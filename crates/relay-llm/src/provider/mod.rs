//! Provider trait and the HTTP adapter behind it

pub mod gateway;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use relay_config::ProviderSpec;
use relay_core::{Dao, MemoryDao};
use tokio_util::sync::CancellationToken;

pub use self::gateway::GatewayProvider;
use crate::dialect::Dialect;
use crate::error::LlmError;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse};

/// Ordered chunks of one streamed answer, ended by exhaustion or one error
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionStreamResponse, LlmError>> + Send>>;

/// Capability set every adapter implements
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name, as configured
    fn name(&self) -> &str;

    /// Model names this adapter serves
    fn list_models(&self) -> &[String];

    /// Send a non-streaming completion request
    async fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError>;

    /// Send a streaming completion request
    ///
    /// Cancelling `cancel` before the upstream answers yields
    /// `LlmError::Cancelled`; cancelling afterwards ends the stream without
    /// delivering any further chunk.
    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChatStream, LlmError>;
}

/// Builds adapters for validated backends
pub trait ProviderFactory: Send + Sync {
    fn build(&self, name: &str, spec: &ProviderSpec) -> Result<Arc<dyn Provider>, LlmError>;
}

/// Builds a [`GatewayProvider`] per backend, sharing one HTTP client
pub struct HttpProviderFactory {
    client: reqwest::Client,
    dao: Arc<dyn Dao>,
}

impl HttpProviderFactory {
    pub fn new(dao: Arc<dyn Dao>) -> Self {
        Self::with_client(reqwest::Client::new(), dao)
    }

    pub fn with_client(client: reqwest::Client, dao: Arc<dyn Dao>) -> Self {
        Self { client, dao }
    }
}

impl Default for HttpProviderFactory {
    fn default() -> Self {
        Self::new(Arc::new(MemoryDao::new()))
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, name: &str, spec: &ProviderSpec) -> Result<Arc<dyn Provider>, LlmError> {
        let dialect = Dialect::from_spec(spec)?;

        Ok(Arc::new(GatewayProvider::new(
            name.to_owned(),
            self.client.clone(),
            dialect,
            spec.list_models(),
            Arc::clone(&self.dao),
        )))
    }
}
