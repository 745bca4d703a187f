//! Wire dialects spoken by the gateway adapter
//!
//! Every upstream, direct or behind the AI gateway, speaks one of three
//! dialects. Each dialect owns one handler per concern: URL, payload,
//! headers, signing, response parsing and stream decoding. Only the URL
//! prefix differs between a direct upstream and a gateway sub-provider.

pub mod azure;
pub mod bedrock;
pub mod keyed;

use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use relay_config::{Backend, GatewayProviderType, GatewayUpstream, KeyedSpec, ProviderSpec, ProviderType};
use url::Url;

pub use self::azure::AzureDialect;
pub use self::bedrock::BedrockDialect;
pub use self::keyed::{AuthScheme, KeyedDialect, OutboundRequest};
use crate::convert::bedrock::{to_chat_completion, to_stream_chunk};
use crate::error::LlmError;
use crate::protocol::bedrock::{BedrockRequest, BedrockResponse};
use crate::sse::decode_events;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, FinishReason};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
const OPEN_ROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const APPLICATION_JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";
const AMAZON_EVENT_STREAM: &str = "application/vnd.amazon.eventstream";

static API_KEY: HeaderName = HeaderName::from_static("api-key");

/// Decoded chunks of one streamed answer, before delivery to the caller
pub type ChunkStream = BoxStream<'static, Result<ChatCompletionStreamResponse, LlmError>>;

/// Wire format family of an upstream
#[derive(Debug, Clone)]
pub enum Dialect {
    /// OpenAI-compatible body, API key in `Authorization`
    Keyed(KeyedDialect),
    /// OpenAI-compatible body, deployment in the URL, `api-key` header
    Azure(AzureDialect),
    /// Claude text completion body, SigV4 signed
    Bedrock(BedrockDialect),
}

impl Dialect {
    /// Pick the dialect and URL prefix for a validated backend
    ///
    /// # Errors
    ///
    /// `LlmError::UnsupportedProvider` for provider types without an HTTP
    /// adapter (cookie-authenticated and Replicate predictions backends).
    pub fn from_spec(spec: &ProviderSpec) -> Result<Self, LlmError> {
        match &spec.backend {
            Backend::Keyed(keyed) => direct_keyed(spec.provider_type, keyed),
            Backend::Azure(azure) => Ok(Self::Azure(AzureDialect::direct(azure.clone()))),
            Backend::Bedrock(bedrock) => Ok(Self::Bedrock(BedrockDialect::direct(bedrock))),
            Backend::Gateway(gateway) => {
                let prefix = gateway.provider_url();
                Ok(match &gateway.upstream {
                    GatewayUpstream::Keyed { provider_type, api_key } => {
                        let endpoint = match provider_type {
                            // Workers AI's OpenAI-compatible route, model in the body
                            GatewayProviderType::WorkersAi => format!("{prefix}/v1/chat/completions"),
                            _ => format!("{prefix}/chat/completions"),
                        };
                        let scheme = match provider_type {
                            GatewayProviderType::Replicate => AuthScheme::Token,
                            _ => AuthScheme::Bearer,
                        };
                        Self::Keyed(KeyedDialect::new(endpoint, api_key.clone(), scheme))
                    }
                    GatewayUpstream::Azure(azure) => Self::Azure(AzureDialect::gateway(&prefix, azure.clone())),
                    GatewayUpstream::Bedrock(bedrock) => Self::Bedrock(BedrockDialect::gateway(&prefix, bedrock)),
                })
            }
        }
    }

    /// Endpoint for a call against `model`
    pub fn url(&self, provider: &str, model: &str) -> Result<String, LlmError> {
        match self {
            Self::Keyed(keyed) => Ok(keyed.url().to_owned()),
            Self::Azure(azure) => azure.url(model).map_err(|e| LlmError::build(provider, e)),
            Self::Bedrock(bedrock) => Ok(bedrock.url(model)),
        }
    }

    /// Serialized request body
    pub fn payload(&self, provider: &str, req: &ChatCompletionRequest, stream: bool) -> Result<Vec<u8>, LlmError> {
        let body = match self {
            Self::Keyed(_) | Self::Azure(_) => serde_json::to_vec(&OutboundRequest::new(req, stream)),
            Self::Bedrock(_) => serde_json::to_vec(&BedrockRequest::from(req)),
        };
        body.map_err(|e| LlmError::build(provider, e))
    }

    /// Content negotiation and credential headers
    pub fn headers(&self, provider: &str, stream: bool) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

        let accept = match (self, stream) {
            (_, false) => APPLICATION_JSON,
            (Self::Bedrock(bedrock), true) if bedrock.streams_events() => AMAZON_EVENT_STREAM,
            (Self::Bedrock(_), true) => APPLICATION_JSON,
            (_, true) => EVENT_STREAM,
        };
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        match self {
            Self::Keyed(keyed) => {
                let value = keyed.authorization().map_err(|e| LlmError::build(provider, e))?;
                headers.insert(AUTHORIZATION, value);
            }
            Self::Azure(azure) => {
                let value = azure.api_key().map_err(|e| LlmError::build(provider, e))?;
                headers.insert(API_KEY.clone(), value);
            }
            Self::Bedrock(_) => {}
        }

        Ok(headers)
    }

    /// Signature headers to add on top of [`Self::headers`]; empty for
    /// dialects that are not signed
    ///
    /// Only `content-type` (and the host) is covered, so the gateway may
    /// adjust the remaining headers in transit.
    pub fn sign(&self, provider: &str, model: &str, body: &[u8]) -> Result<HeaderMap, LlmError> {
        let Self::Bedrock(bedrock) = self else {
            return Ok(HeaderMap::new());
        };

        let mut signed = HeaderMap::new();
        signed.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        bedrock.sign(model, &signed, body).map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "failed to sign request");
            LlmError::signing(provider, e)
        })
    }

    /// Decode a successful synchronous response body
    pub fn parse_response(&self, provider: &str, model: &str, body: &[u8]) -> Result<ChatCompletionResponse, LlmError> {
        match self {
            Self::Keyed(_) | Self::Azure(_) => serde_json::from_slice(body).map_err(|e| LlmError::decode(provider, e)),
            Self::Bedrock(_) => {
                let native: BedrockResponse = serde_json::from_slice(body).map_err(|e| LlmError::decode(provider, e))?;
                Ok(to_chat_completion(native, bedrock_id(), model, unix_now()))
            }
        }
    }

    /// Decode a successful streaming response into canonical chunks
    ///
    /// A Bedrock answer sent as plain JSON (direct `/invoke`) becomes a
    /// single terminal chunk.
    pub fn decode_stream(&self, provider: &str, model: &str, response: reqwest::Response) -> ChunkStream {
        match self {
            Self::Keyed(_) | Self::Azure(_) => {
                decode_events::<ChatCompletionStreamResponse, _, _, _>(provider, response.bytes_stream())
            }
            Self::Bedrock(_) => {
                let id = bedrock_id();
                let model = model.to_owned();
                let created = unix_now();

                if is_json(&response) {
                    let provider = provider.to_owned();
                    return stream::once(async move {
                        let body = response.bytes().await.map_err(|e| LlmError::transport(&provider, e))?;
                        let native: BedrockResponse =
                            serde_json::from_slice(&body).map_err(|e| LlmError::decode(&provider, e))?;
                        let mut chunk = to_stream_chunk(native, &id, &model, created);
                        for choice in &mut chunk.choices {
                            choice.finish_reason.get_or_insert(FinishReason::Stop);
                        }
                        Ok(chunk)
                    })
                    .boxed();
                }

                decode_events::<BedrockResponse, _, _, _>(provider, response.bytes_stream())
                    .map(move |item| item.map(|chunk| to_stream_chunk(chunk, &id, &model, created)))
                    .boxed()
            }
        }
    }
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(APPLICATION_JSON))
}

fn direct_keyed(provider_type: ProviderType, spec: &KeyedSpec) -> Result<Dialect, LlmError> {
    let default_base = match provider_type {
        ProviderType::Openai => OPENAI_BASE_URL,
        ProviderType::Together => TOGETHER_BASE_URL,
        ProviderType::OpenRouter => OPEN_ROUTER_BASE_URL,
        ProviderType::GoogleAi => GOOGLE_AI_BASE_URL,
        ProviderType::Replicate
        | ProviderType::ClaudeWeb
        | ProviderType::GoogleBard
        | ProviderType::AzureOpenai
        | ProviderType::AwsBedrock
        | ProviderType::Aigateway => {
            return Err(LlmError::UnsupportedProvider {
                provider: provider_type.to_string(),
            });
        }
    };

    let base = spec
        .base_url
        .as_ref()
        .map_or(default_base, Url::as_str)
        .trim_end_matches('/');

    Ok(Dialect::Keyed(KeyedDialect::new(
        format!("{base}/chat/completions"),
        spec.api_key.clone(),
        AuthScheme::Bearer,
    )))
}

fn bedrock_id() -> String {
    format!("bedrock-{}", uuid::Uuid::new_v4())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use relay_config::ProviderConfig;

    use super::*;
    use crate::types::Message;

    fn spec(toml_src: &str) -> ProviderSpec {
        toml::from_str::<ProviderConfig>(toml_src).unwrap().validate().unwrap()
    }

    fn gateway(upstream: &str) -> ProviderSpec {
        spec(&format!(
            r#"
            type = "aigateway"
            [aigateway]
            account_id = "acct"
            name = "gw"
            [aigateway.provider]
            {upstream}
            "#
        ))
    }

    #[test]
    fn direct_openai_uses_default_base_url() {
        let dialect = Dialect::from_spec(&spec("type = \"openai\"\napi_key = \"sk\"")).unwrap();
        assert_eq!(
            dialect.url("p", "gpt-4").unwrap(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn base_url_override_is_honoured() {
        let dialect =
            Dialect::from_spec(&spec("type = \"together\"\napi_key = \"k\"\nbase_url = \"http://localhost:9000/v1/\""))
                .unwrap();
        assert_eq!(dialect.url("p", "m").unwrap(), "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn cookie_providers_have_no_adapter() {
        let err = Dialect::from_spec(&spec("type = \"claude-web\"\napi_key = \"cookie\"")).unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedProvider { ref provider } if provider == "claude-web"));
    }

    #[test]
    fn gateway_keyed_urls() {
        let dialect = Dialect::from_spec(&gateway("type = \"openai\"\napi_key = \"sk\"")).unwrap();
        assert_eq!(
            dialect.url("p", "gpt-4").unwrap(),
            "https://gateway.ai.cloudflare.com/v1/acct/gw/openai/chat/completions"
        );

        let dialect = Dialect::from_spec(&gateway("type = \"workers-ai\"\napi_key = \"cf\"")).unwrap();
        assert_eq!(
            dialect.url("p", "@cf/meta/llama").unwrap(),
            "https://gateway.ai.cloudflare.com/v1/acct/gw/workers-ai/v1/chat/completions"
        );
    }

    #[test]
    fn replicate_through_gateway_uses_token_auth() {
        let dialect = Dialect::from_spec(&gateway("type = \"replicate\"\napi_key = \"r8\"")).unwrap();
        let headers = dialect.headers("p", false).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Token r8");
    }

    #[test]
    fn accept_depends_on_operation_and_dialect() {
        let keyed = Dialect::from_spec(&spec("type = \"openai\"\napi_key = \"sk\"")).unwrap();
        assert_eq!(keyed.headers("p", false).unwrap()[ACCEPT], APPLICATION_JSON);
        assert_eq!(keyed.headers("p", true).unwrap()[ACCEPT], EVENT_STREAM);

        let bedrock = Dialect::from_spec(&gateway(
            "type = \"aws-bedrock\"\n[aigateway.provider.aws_bedrock]\naccess_key = \"a\"\nsecret_key = \"s\"\nregion = \"us-east-1\"",
        ))
        .unwrap();
        let headers = bedrock.headers("p", true).unwrap();
        assert_eq!(headers[ACCEPT], AMAZON_EVENT_STREAM);
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn azure_sends_api_key_header() {
        let dialect = Dialect::from_spec(&spec(
            r#"
            type = "azure-openai"
            [azure_openai]
            api_key = "az"
            resource_name = "contoso"
            [azure_openai.model_deployment_mapping]
            "gpt-4" = "prod"
            "#,
        ))
        .unwrap();

        assert_eq!(dialect.headers("p", false).unwrap()["api-key"], "az");
        assert!(matches!(dialect.url("p", "gpt-35").unwrap_err(), LlmError::Build { .. }));
    }

    #[test]
    fn bedrock_signature_headers_are_added() {
        let dialect = Dialect::from_spec(&spec(
            "type = \"aws-bedrock\"\n[aws_bedrock]\naccess_key = \"AKID\"\nsecret_key = \"s\"\nregion = \"us-east-1\"",
        ))
        .unwrap();
        let req = ChatCompletionRequest::new("anthropic.claude-v2", vec![Message::user("hi")]);
        let body = dialect.payload("p", &req, false).unwrap();

        let signed = dialect.sign("p", "anthropic.claude-v2", &body).unwrap();

        assert!(signed.contains_key(AUTHORIZATION));
        assert!(signed.contains_key("x-amz-date"));
        let native: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(native["prompt"].as_str().unwrap().ends_with("\n\nAssistant:"));
    }

    #[tokio::test]
    async fn direct_bedrock_stream_reads_one_json_body() {
        let dialect = Dialect::from_spec(&spec(
            "type = \"aws-bedrock\"\n[aws_bedrock]\naccess_key = \"AKID\"\nsecret_key = \"s\"\nregion = \"us-east-1\"",
        ))
        .unwrap();
        assert_eq!(dialect.headers("p", true).unwrap()[ACCEPT], APPLICATION_JSON);

        let response = http::Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(
                r#"{"completion":" Hi","stop_reason":"stop_sequence","stop":"\n\nHuman:","amazon-bedrock-invocationMetrics":{"inputTokenCount":7,"outputTokenCount":2}}"#
                    .to_owned(),
            )
            .unwrap();

        let chunks: Vec<_> = dialect
            .decode_stream("bedrock", "anthropic.claude-v2", reqwest::Response::from(response))
            .collect()
            .await;

        assert_eq!(chunks.len(), 1);
        let chunk = chunks.into_iter().next().unwrap().unwrap();
        assert_eq!(chunk.completion_delta(), " Hi");
        assert!(chunk.is_done());
        assert_eq!(chunk.usage, Some(crate::types::Usage::new(7, 2)));
    }

    #[tokio::test]
    async fn bedrock_json_stream_body_that_does_not_parse_is_one_decode_error() {
        let dialect = Dialect::from_spec(&spec(
            "type = \"aws-bedrock\"\n[aws_bedrock]\naccess_key = \"AKID\"\nsecret_key = \"s\"\nregion = \"us-east-1\"",
        ))
        .unwrap();
        let response = http::Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body("{\"completion\":".to_owned())
            .unwrap();

        let chunks: Vec<_> = dialect
            .decode_stream("bedrock", "anthropic.claude-v2", reqwest::Response::from(response))
            .collect()
            .await;

        assert_eq!(chunks.len(), 1);
        assert!(matches!(chunks[0], Err(LlmError::Decode { ref provider, .. }) if provider == "bedrock"));
    }

    #[test]
    fn keyed_dialects_are_not_signed() {
        let dialect = Dialect::from_spec(&spec("type = \"openai\"\napi_key = \"sk\"")).unwrap();
        assert!(dialect.sign("p", "gpt-4", b"{}").unwrap().is_empty());
    }
}
