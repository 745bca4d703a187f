//! Backend provider configuration
//!
//! Each provider table is deserialized on its own into a [`ProviderEntry`] so that one
//! broken entry cannot prevent the others from loading. [`ProviderConfig::validate`]
//! turns a raw entry into a [`ProviderSpec`], the only form adapters accept.

use std::collections::BTreeMap;
use std::str::FromStr;

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use strum::{Display, EnumString, IntoStaticStr};
use url::Url;

use crate::error::ConfigError;
use crate::models::{
    AI_GATEWAY_HOST, DEFAULT_AWS_BEDROCK_MODELS, DEFAULT_AZURE_API_VERSION, DEFAULT_OPENAI_CHAT_MODELS, to_owned_list,
};

/// Top-level LLM configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Backends keyed by name, in file order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderEntry>,
}

/// One `[llm.providers.<name>]` table
///
/// A table that does not match [`ProviderConfig`] (unknown key, wrong value
/// type) is kept as [`ProviderEntry::Malformed`] instead of failing the
/// whole file; it surfaces when the backend is validated.
#[derive(Debug, Clone)]
pub enum ProviderEntry {
    Parsed(ProviderConfig),
    Malformed(ConfigError),
}

impl ProviderEntry {
    /// Raw `type` value, when the table parsed
    pub fn provider_type(&self) -> Option<&str> {
        match self {
            Self::Parsed(config) => Some(&config.provider_type),
            Self::Malformed(_) => None,
        }
    }

    /// See [`ProviderConfig::validate`]
    ///
    /// # Errors
    ///
    /// The parse error of a malformed table, or the first validation error
    pub fn validate(&self) -> Result<ProviderSpec, ConfigError> {
        match self {
            Self::Parsed(config) => config.validate(),
            Self::Malformed(e) => Err(e.clone()),
        }
    }
}

impl From<ProviderConfig> for ProviderEntry {
    fn from(config: ProviderConfig) -> Self {
        Self::Parsed(config)
    }
}

impl<'de> Deserialize<'de> for ProviderEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let table = toml::Value::deserialize(deserializer)?;

        Ok(match table.try_into::<ProviderConfig>() {
            Ok(config) => Self::Parsed(config),
            Err(e) => Self::Malformed(ConfigError::InvalidField {
                field: "provider".to_owned(),
                reason: e.message().to_owned(),
            }),
        })
    }
}

/// Backend families a provider entry can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ProviderType {
    Openai,
    AzureOpenai,
    AwsBedrock,
    Aigateway,
    Together,
    OpenRouter,
    Replicate,
    ClaudeWeb,
    GoogleBard,
    GoogleAi,
}

/// Upstreams reachable through the AI gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum GatewayProviderType {
    WorkersAi,
    Openai,
    Huggingface,
    Replicate,
    AzureOpenai,
    AwsBedrock,
}

/// Raw configuration for a single backend
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider type, one of [`ProviderType`] in kebab-case
    #[serde(rename = "type", default)]
    pub provider_type: String,
    /// Models this backend serves; overrides the built-in list
    #[serde(default)]
    pub models: Vec<String>,
    /// API key for key-authenticated providers
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override for key-authenticated providers
    #[serde(default)]
    pub base_url: Option<String>,
    /// Azure OpenAI settings
    #[serde(default)]
    pub azure_openai: Option<AzureOpenAiConfig>,
    /// AWS Bedrock settings
    #[serde(default)]
    pub aws_bedrock: Option<AwsBedrockConfig>,
    /// AI gateway settings
    #[serde(default)]
    pub aigateway: Option<AiGatewayConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AzureOpenAiConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Azure resource (the `<resource>.openai.azure.com` subdomain)
    #[serde(default)]
    pub resource_name: Option<String>,
    /// Model name -> deployment name
    #[serde(default)]
    pub model_deployment_mapping: BTreeMap<String, String>,
    /// REST API version, `api-version` query parameter
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsBedrockConfig {
    #[serde(default)]
    pub access_key: Option<SecretString>,
    #[serde(default)]
    pub secret_key: Option<SecretString>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiGatewayConfig {
    /// Account tag that owns the gateway
    #[serde(default)]
    pub account_id: Option<String>,
    /// Gateway name
    #[serde(default)]
    pub name: Option<String>,
    /// Gateway host override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Upstream the gateway forwards to
    #[serde(default)]
    pub provider: Option<AiGatewayProviderConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiGatewayProviderConfig {
    /// Upstream type, one of [`GatewayProviderType`] in kebab-case
    #[serde(rename = "type", default)]
    pub provider_type: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub azure_openai: Option<AzureOpenAiConfig>,
    #[serde(default)]
    pub aws_bedrock: Option<AwsBedrockConfig>,
}

/// A validated backend, ready to build an adapter from
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    /// Family this backend belongs to
    pub provider_type: ProviderType,
    /// Connection details
    pub backend: Backend,
    models: Vec<String>,
}

/// Connection details per backend family
#[derive(Debug, Clone)]
pub enum Backend {
    /// API-key authenticated, OpenAI-compatible endpoint
    Keyed(KeyedSpec),
    /// Azure OpenAI deployment-mapped endpoint
    Azure(AzureSpec),
    /// SigV4-signed AWS Bedrock endpoint
    Bedrock(BedrockSpec),
    /// AI gateway in front of one upstream
    Gateway(GatewaySpec),
}

#[derive(Debug, Clone)]
pub struct KeyedSpec {
    pub api_key: SecretString,
    pub base_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct AzureSpec {
    pub api_key: SecretString,
    pub resource_name: String,
    pub deployments: BTreeMap<String, String>,
    pub api_version: String,
}

impl AzureSpec {
    /// Deployment configured for a model
    pub fn deployment(&self, model: &str) -> Option<&str> {
        self.deployments.get(model).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct BedrockSpec {
    pub access_key: SecretString,
    pub secret_key: SecretString,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct GatewaySpec {
    pub account_id: String,
    pub name: String,
    pub base_url: Url,
    pub upstream: GatewayUpstream,
}

impl GatewaySpec {
    /// `<host>/<account>/<gateway>/<provider>`, without a trailing slash
    pub fn provider_url(&self) -> String {
        let host = self.base_url.as_str().trim_end_matches('/');
        format!("{host}/{}/{}/{}", self.account_id, self.name, self.upstream.provider_type())
    }
}

/// Upstream behind an AI gateway
#[derive(Debug, Clone)]
pub enum GatewayUpstream {
    Keyed {
        provider_type: GatewayProviderType,
        api_key: SecretString,
    },
    Azure(AzureSpec),
    Bedrock(BedrockSpec),
}

impl GatewayUpstream {
    pub const fn provider_type(&self) -> GatewayProviderType {
        match self {
            Self::Keyed { provider_type, .. } => *provider_type,
            Self::Azure(_) => GatewayProviderType::AzureOpenai,
            Self::Bedrock(_) => GatewayProviderType::AwsBedrock,
        }
    }
}

impl ProviderConfig {
    /// Check the provider-type-specific required fields
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid field, or
    /// `ConfigError::UnsupportedProvider` for an unknown type.
    pub fn validate(&self) -> Result<ProviderSpec, ConfigError> {
        if self.provider_type.is_empty() {
            return Err(ConfigError::missing("type"));
        }
        let provider_type = ProviderType::from_str(&self.provider_type).map_err(|_| ConfigError::UnsupportedProvider {
            provider: self.provider_type.clone(),
        })?;

        let backend = match provider_type {
            ProviderType::Openai
            | ProviderType::Together
            | ProviderType::OpenRouter
            | ProviderType::Replicate
            | ProviderType::ClaudeWeb
            | ProviderType::GoogleBard
            | ProviderType::GoogleAi => Backend::Keyed(KeyedSpec {
                api_key: required_secret(self.api_key.as_ref(), "api_key")?,
                base_url: optional_url(self.base_url.as_deref(), "base_url")?,
            }),
            ProviderType::AzureOpenai => Backend::Azure(validate_azure(self.azure_openai.as_ref(), "azure_openai")?),
            ProviderType::AwsBedrock => Backend::Bedrock(validate_bedrock(self.aws_bedrock.as_ref(), "aws_bedrock")?),
            ProviderType::Aigateway => Backend::Gateway(validate_gateway(self.aigateway.as_ref())?),
        };

        Ok(ProviderSpec {
            provider_type,
            backend,
            models: self.models.clone(),
        })
    }
}

impl ProviderSpec {
    /// Model names this backend serves
    ///
    /// The explicit `models` list wins; otherwise the family's static list
    /// or the deployment mapping keys (sorted). Never queries the backend.
    pub fn list_models(&self) -> Vec<String> {
        if !self.models.is_empty() {
            return self.models.clone();
        }

        match &self.backend {
            Backend::Keyed(_) if self.provider_type == ProviderType::Openai => {
                to_owned_list(DEFAULT_OPENAI_CHAT_MODELS)
            }
            Backend::Keyed(_) => Vec::new(),
            Backend::Azure(azure) => azure.deployments.keys().cloned().collect(),
            Backend::Bedrock(_) => to_owned_list(DEFAULT_AWS_BEDROCK_MODELS),
            Backend::Gateway(gateway) => match &gateway.upstream {
                GatewayUpstream::Keyed {
                    provider_type: GatewayProviderType::Openai,
                    ..
                } => to_owned_list(DEFAULT_OPENAI_CHAT_MODELS),
                GatewayUpstream::Keyed { .. } => Vec::new(),
                GatewayUpstream::Azure(azure) => azure.deployments.keys().cloned().collect(),
                GatewayUpstream::Bedrock(_) => to_owned_list(DEFAULT_AWS_BEDROCK_MODELS),
            },
        }
    }
}

fn validate_azure(config: Option<&AzureOpenAiConfig>, prefix: &str) -> Result<AzureSpec, ConfigError> {
    let config = config.ok_or_else(|| ConfigError::missing(format!("{prefix}.api_key")))?;

    let api_key = required_secret(config.api_key.as_ref(), &format!("{prefix}.api_key"))?;
    let resource_name = required_str(config.resource_name.as_deref(), &format!("{prefix}.resource_name"))?;
    if config.model_deployment_mapping.is_empty() {
        return Err(ConfigError::missing(format!("{prefix}.model_deployment_mapping")));
    }
    if let Some((model, _)) = config.model_deployment_mapping.iter().find(|(_, d)| d.trim().is_empty()) {
        return Err(ConfigError::InvalidField {
            field: format!("{prefix}.model_deployment_mapping"),
            reason: format!("empty deployment for model `{model}`"),
        });
    }

    Ok(AzureSpec {
        api_key,
        resource_name,
        deployments: config.model_deployment_mapping.clone(),
        api_version: config
            .version
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_owned()),
    })
}

fn validate_bedrock(config: Option<&AwsBedrockConfig>, prefix: &str) -> Result<BedrockSpec, ConfigError> {
    let config = config.ok_or_else(|| ConfigError::missing(format!("{prefix}.access_key")))?;

    Ok(BedrockSpec {
        access_key: required_secret(config.access_key.as_ref(), &format!("{prefix}.access_key"))?,
        secret_key: required_secret(config.secret_key.as_ref(), &format!("{prefix}.secret_key"))?,
        region: required_str(config.region.as_deref(), &format!("{prefix}.region"))?,
    })
}

fn validate_gateway(config: Option<&AiGatewayConfig>) -> Result<GatewaySpec, ConfigError> {
    let config = config.ok_or_else(|| ConfigError::missing("aigateway.account_id"))?;

    let account_id = required_str(config.account_id.as_deref(), "aigateway.account_id")?;
    let name = required_str(config.name.as_deref(), "aigateway.name")?;
    let base_url = optional_url(config.base_url.as_deref(), "aigateway.base_url")?
        .map_or_else(|| Url::parse(AI_GATEWAY_HOST), Ok)
        .map_err(|e| ConfigError::InvalidField {
            field: "aigateway.base_url".to_owned(),
            reason: e.to_string(),
        })?;

    let provider = config
        .provider
        .as_ref()
        .filter(|p| !p.provider_type.is_empty())
        .ok_or_else(|| ConfigError::missing("aigateway.provider.type"))?;
    let provider_type =
        GatewayProviderType::from_str(&provider.provider_type).map_err(|_| ConfigError::UnsupportedProvider {
            provider: format!("aigateway/{}", provider.provider_type),
        })?;

    let upstream = match provider_type {
        GatewayProviderType::WorkersAi
        | GatewayProviderType::Openai
        | GatewayProviderType::Huggingface
        | GatewayProviderType::Replicate => GatewayUpstream::Keyed {
            provider_type,
            api_key: required_secret(provider.api_key.as_ref(), "aigateway.provider.api_key")?,
        },
        GatewayProviderType::AzureOpenai => GatewayUpstream::Azure(validate_azure(
            provider.azure_openai.as_ref(),
            "aigateway.provider.azure_openai",
        )?),
        GatewayProviderType::AwsBedrock => GatewayUpstream::Bedrock(validate_bedrock(
            provider.aws_bedrock.as_ref(),
            "aigateway.provider.aws_bedrock",
        )?),
    };

    Ok(GatewaySpec {
        account_id,
        name,
        base_url,
        upstream,
    })
}

fn required_secret(value: Option<&SecretString>, field: &str) -> Result<SecretString, ConfigError> {
    value
        .filter(|v| !v.expose_secret().trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::missing(field))
}

fn required_str(value: Option<&str>, field: &str) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::missing(field))
}

fn optional_url(value: Option<&str>, field: &str) -> Result<Option<Url>, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            Url::parse(v).map_err(|e| ConfigError::InvalidField {
                field: field.to_owned(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
