//! API-key authenticated, OpenAI-compatible upstreams

use http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::types::{ChatCompletionRequest, Message};

/// How the API key is presented in the `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    /// Replicate's `Token <key>`
    Token,
}

#[derive(Debug, Clone)]
pub struct KeyedDialect {
    endpoint: String,
    api_key: SecretString,
    scheme: AuthScheme,
}

impl KeyedDialect {
    /// `endpoint` is the full chat completions URL
    pub const fn new(endpoint: String, api_key: SecretString, scheme: AuthScheme) -> Self {
        Self {
            endpoint,
            api_key,
            scheme,
        }
    }

    pub fn url(&self) -> &str {
        &self.endpoint
    }

    pub fn authorization(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let prefix = match self.scheme {
            AuthScheme::Bearer => "Bearer",
            AuthScheme::Token => "Token",
        };
        let mut value = HeaderValue::from_str(&format!("{prefix} {}", self.api_key.expose_secret()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Canonical request as sent upstream, with the operation's stream flag
#[derive(Debug, Serialize)]
pub struct OutboundRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

impl<'a> OutboundRequest<'a> {
    pub fn new(req: &'a ChatCompletionRequest, stream: bool) -> Self {
        Self {
            model: &req.model,
            messages: &req.messages,
            stream,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            top_p: req.top_p,
            stop: req.stop.as_deref(),
        }
    }
}
