//! Single HTTP adapter shared by every dialect

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use relay_core::{Dao, UsageRecord};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ChatStream, Provider};
use crate::dialect::{ChunkStream, Dialect};
use crate::error::LlmError;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, Usage};

/// Chunks buffered between the network task and the consumer
const STREAM_BUFFER: usize = 16;

/// Adapter for one configured backend
pub struct GatewayProvider {
    name: String,
    client: Client,
    dialect: Dialect,
    models: Vec<String>,
    dao: Arc<dyn Dao>,
}

impl GatewayProvider {
    pub fn new(name: String, client: Client, dialect: Dialect, models: Vec<String>, dao: Arc<dyn Dao>) -> Self {
        Self {
            name,
            client,
            dialect,
            models,
            dao,
        }
    }

    /// Build the outbound request for either operation
    fn prepare(&self, request: &ChatCompletionRequest, stream: bool) -> Result<reqwest::RequestBuilder, LlmError> {
        let url = self.dialect.url(&self.name, &request.model)?;
        let body = self.dialect.payload(&self.name, request, stream)?;
        let mut headers = self.dialect.headers(&self.name, stream)?;
        headers.extend(self.dialect.sign(&self.name, &request.model, &body)?);

        tracing::debug!(provider = %self.name, model = %request.model, url = %url, stream, "sending upstream request");

        Ok(self.client.post(url).headers(headers).body(body))
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "upstream request failed");
            LlmError::transport(&self.name, e)
        })?;

        check_status(&self.name, response).await
    }
}

#[async_trait]
impl Provider for GatewayProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_models(&self) -> &[String] {
        &self.models
    }

    async fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let builder = self.prepare(request, false)?;
        let response = self.send(builder).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| LlmError::transport(&self.name, e))?;
        let completion = self.dialect.parse_response(&self.name, &request.model, &body)?;

        if let Some(usage) = completion.usage {
            record_usage(self.dao.as_ref(), &usage_record(&self.name, &request.model, usage, false)).await;
        }

        Ok(completion)
    }

    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChatStream, LlmError> {
        let builder = self.prepare(request, true)?;

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(provider = %self.name, "stream cancelled before upstream answered");
                return Err(LlmError::Cancelled);
            }
            response = self.send(builder) => response?,
        };

        let chunks = self.dialect.decode_stream(&self.name, &request.model, response);
        let usage = UsageContext {
            provider: self.name.clone(),
            model: request.model.clone(),
            dao: Arc::clone(&self.dao),
        };

        Ok(spawn_pump(chunks, cancel, usage))
    }
}

/// Where to record usage once a stream ends
struct UsageContext {
    provider: String,
    model: String,
    dao: Arc<dyn Dao>,
}

/// Move decoded chunks into a bounded channel on a separate task
///
/// The task stops at the first error, when the consumer goes away, or when
/// `cancel` fires; dropping `chunks` releases the connection. Usage is
/// recorded before the channel closes. The consumer side checks `cancel`
/// before every chunk, so nothing buffered is delivered after cancellation.
fn spawn_pump(mut chunks: ChunkStream, cancel: CancellationToken, usage: UsageContext) -> ChatStream {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let pump_cancel = cancel.clone();

    tokio::spawn(async move {
        let mut last_usage: Option<Usage> = None;

        loop {
            let item = tokio::select! {
                biased;
                () = pump_cancel.cancelled() => {
                    tracing::debug!(provider = %usage.provider, "stream cancelled by caller");
                    break;
                }
                item = chunks.next() => item,
            };
            let Some(item) = item else {
                break;
            };

            let failed = item.is_err();
            if let Ok(chunk) = &item
                && chunk.usage.is_some()
            {
                last_usage = chunk.usage;
            }

            let sent = tokio::select! {
                biased;
                () = pump_cancel.cancelled() => break,
                sent = tx.send(item) => sent.is_ok(),
            };
            if !sent || failed {
                break;
            }
        }

        drop(chunks);
        if let Some(total) = last_usage {
            record_usage(usage.dao.as_ref(), &usage_record(&usage.provider, &usage.model, total, true)).await;
        }
    });

    Box::pin(futures_util::stream::unfold((rx, cancel), |(mut rx, cancel)| async move {
        if cancel.is_cancelled() {
            return None;
        }
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            item = rx.recv() => item,
        }?;
        Some((item, (rx, cancel)))
    }))
}

async fn check_status(provider: &str, response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider = %provider, status = %status, "upstream returned error");

    Err(LlmError::UpstreamStatus {
        provider: provider.to_owned(),
        status,
        headers,
        body,
    })
}

fn usage_record(provider: &str, model: &str, usage: Usage, streamed: bool) -> UsageRecord {
    UsageRecord {
        provider: provider.to_owned(),
        model: model.to_owned(),
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        streamed,
    }
}

/// Persistence failures never fail the call
async fn record_usage(dao: &dyn Dao, record: &UsageRecord) {
    if let Err(e) = dao.record_usage(record).await {
        tracing::warn!(provider = %record.provider, error = %e, "failed to record usage");
    }
}
