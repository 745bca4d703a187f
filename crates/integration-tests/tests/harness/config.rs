//! Programmatic configuration builder for integration tests

use std::collections::BTreeMap;

use relay_config::{AiGatewayConfig, AiGatewayProviderConfig, AwsBedrockConfig, AzureOpenAiConfig, LlmConfig, ProviderConfig};
use secrecy::SecretString;

/// Account and gateway name every gateway backend is configured with
pub const GATEWAY_ACCOUNT: &str = "acct";
pub const GATEWAY_NAME: &str = "gw";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: LlmConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LlmConfig::default(),
        }
    }

    /// OpenAI-compatible backend pointed at a mock upstream
    pub fn with_keyed_provider(mut self, name: &str, base_url: &str, models: &[&str]) -> Self {
        self.config.providers.insert(
            name.to_owned(),
            ProviderConfig {
                provider_type: "openai".to_owned(),
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url.to_owned()),
                models: owned(models),
                ..ProviderConfig::default()
            }
            .into(),
        );
        self
    }

    /// AI gateway forwarding to Bedrock, with the gateway host at `gateway_url`
    pub fn with_gateway_bedrock(mut self, name: &str, gateway_url: &str, models: &[&str]) -> Self {
        let provider = AiGatewayProviderConfig {
            provider_type: "aws-bedrock".to_owned(),
            aws_bedrock: Some(AwsBedrockConfig {
                access_key: Some(SecretString::from("AKIDEXAMPLE")),
                secret_key: Some(SecretString::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")),
                region: Some("us-east-1".to_owned()),
            }),
            ..AiGatewayProviderConfig::default()
        };
        self.insert_gateway(name, gateway_url, models, provider)
    }

    /// AI gateway forwarding to an OpenAI-compatible upstream
    pub fn with_gateway_keyed(mut self, name: &str, gateway_url: &str, upstream: &str, models: &[&str]) -> Self {
        let provider = AiGatewayProviderConfig {
            provider_type: upstream.to_owned(),
            api_key: Some(SecretString::from("gateway-upstream-key")),
            ..AiGatewayProviderConfig::default()
        };
        self.insert_gateway(name, gateway_url, models, provider)
    }

    /// AI gateway forwarding to Azure, mapping `gpt-4` to deployment `prod`
    pub fn with_gateway_azure(mut self, name: &str, gateway_url: &str) -> Self {
        let provider = AiGatewayProviderConfig {
            provider_type: "azure-openai".to_owned(),
            azure_openai: Some(AzureOpenAiConfig {
                api_key: Some(SecretString::from("azure-key")),
                resource_name: Some("contoso".to_owned()),
                model_deployment_mapping: BTreeMap::from([("gpt-4".to_owned(), "prod".to_owned())]),
                version: Some("2024-02-01".to_owned()),
            }),
            ..AiGatewayProviderConfig::default()
        };
        self.insert_gateway(name, gateway_url, &[], provider)
    }

    /// Backend that fails validation
    pub fn with_broken_provider(mut self, name: &str) -> Self {
        self.config.providers.insert(
            name.to_owned(),
            ProviderConfig {
                provider_type: "aws-bedrock".to_owned(),
                ..ProviderConfig::default()
            }
            .into(),
        );
        self
    }

    pub fn build(self) -> LlmConfig {
        self.config
    }

    fn insert_gateway(mut self, name: &str, gateway_url: &str, models: &[&str], provider: AiGatewayProviderConfig) -> Self {
        self.config.providers.insert(
            name.to_owned(),
            ProviderConfig {
                provider_type: "aigateway".to_owned(),
                models: owned(models),
                aigateway: Some(AiGatewayConfig {
                    account_id: Some(GATEWAY_ACCOUNT.to_owned()),
                    name: Some(GATEWAY_NAME.to_owned()),
                    base_url: Some(gateway_url.to_owned()),
                    provider: Some(provider),
                }),
                ..ProviderConfig::default()
            }
            .into(),
        );
        self
    }
}

fn owned(models: &[&str]) -> Vec<String> {
    models.iter().map(|&m| m.to_owned()).collect()
}
