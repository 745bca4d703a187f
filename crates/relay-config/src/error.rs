use thiserror::Error;

/// Why a backend's configuration was rejected
///
/// Field names are dotted paths relative to the provider entry, e.g.
/// `aigateway.provider.aws_bedrock.region`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required field is absent or empty
    #[error("{field} is required")]
    MissingField { field: String },

    /// A field is present but malformed
    #[error("{field} is invalid: {reason}")]
    InvalidField { field: String, reason: String },

    /// The provider type is not one of the known enumeration values
    #[error("unsupported provider type `{provider}`")]
    UnsupportedProvider { provider: String },
}

impl ConfigError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }
}
