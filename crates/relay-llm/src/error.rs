use http::{HeaderMap, StatusCode};
use relay_config::ConfigError;
use relay_core::HttpError;
use thiserror::Error;

/// Errors that can occur while routing or executing a completion
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend configuration was rejected; fatal to that backend only
    #[error("invalid provider configuration: {0}")]
    Config(ConfigError),

    /// Provider type has no adapter
    #[error("no adapter for provider type `{provider}`")]
    UnsupportedProvider { provider: String },

    /// Payload, URL or header construction failed
    #[error("{provider}: failed to build request: {message}")]
    Build { provider: String, message: String },

    /// Request signing failed
    #[error("{provider}: failed to sign request: {message}")]
    Signing { provider: String, message: String },

    /// Network failure talking to the upstream
    #[error("{provider}: transport error: {message}")]
    Transport { provider: String, message: String },

    /// Upstream answered with a non-2xx status
    #[error("{provider}: upstream returned {status}: {body}")]
    UpstreamStatus {
        provider: String,
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },

    /// Malformed response body or stream event
    #[error("{provider}: failed to decode response: {message}")]
    Decode { provider: String, message: String },

    /// Request did not name a model
    #[error("model name is empty")]
    EmptyModel,

    /// No configured backend serves the model
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// Every configured backend failed to build or none serves a model
    #[error("no usable providers configured")]
    NoProviders,

    /// Caller cancelled before the stream started
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ConfigError> for LlmError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::UnsupportedProvider { provider } => Self::UnsupportedProvider { provider },
            other => Self::Config(other),
        }
    }
}

impl LlmError {
    pub(crate) fn build(provider: &str, message: impl std::fmt::Display) -> Self {
        Self::Build {
            provider: provider.to_owned(),
            message: message.to_string(),
        }
    }

    pub(crate) fn signing(provider: &str, message: impl std::fmt::Display) -> Self {
        Self::Signing {
            provider: provider.to_owned(),
            message: message.to_string(),
        }
    }

    pub(crate) fn transport(provider: &str, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider: provider.to_owned(),
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(provider: &str, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            provider: provider.to_owned(),
            message: message.to_string(),
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyModel => StatusCode::BAD_REQUEST,
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::UpstreamStatus { status, .. } if status.is_client_error() => *status,
            Self::UpstreamStatus { .. } | Self::Transport { .. } | Self::Decode { .. } => StatusCode::BAD_GATEWAY,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Config(_)
            | Self::UnsupportedProvider { .. }
            | Self::Build { .. }
            | Self::Signing { .. }
            | Self::NoProviders
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::EmptyModel => "invalid_request_error",
            Self::ModelNotFound { .. } => "not_found_error",
            Self::UpstreamStatus { .. } | Self::Transport { .. } | Self::Decode { .. } => "upstream_error",
            Self::Cancelled => "cancelled",
            Self::Config(_)
            | Self::UnsupportedProvider { .. }
            | Self::Build { .. }
            | Self::Signing { .. }
            | Self::NoProviders
            | Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::EmptyModel | Self::ModelNotFound { .. } | Self::Cancelled => self.to_string(),
            Self::UpstreamStatus { provider, status, .. } => format!("{provider}: upstream returned {status}"),
            Self::Transport { provider, .. } | Self::Decode { provider, .. } => {
                format!("{provider}: upstream request failed")
            }
            _ => "an internal error occurred".to_owned(),
        }
    }
}
