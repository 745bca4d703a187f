//! Static model lists for backends that are not configured with an explicit one

/// Chat models served by the OpenAI API
pub const DEFAULT_OPENAI_CHAT_MODELS: &[&str] = &[
    "gpt-4-1106-preview",
    "gpt-4-vision-preview",
    "gpt-4",
    "gpt-4-32k",
    "gpt-4-0613",
    "gpt-4-32k-0613",
    "gpt-4-0314",
    "gpt-4-32k-0314",
    "gpt-3.5-turbo-1106",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-3.5-turbo-instruct",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-16k-0613",
    "gpt-3.5-turbo-0301",
];

/// Claude text-completion models hosted on AWS Bedrock
pub const DEFAULT_AWS_BEDROCK_MODELS: &[&str] = &[
    "anthropic.claude-v1",
    "anthropic.claude-v2",
    "anthropic.claude-v2:1",
    "anthropic.claude-instant-v1",
];

/// Azure OpenAI REST API version used when none is configured
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

/// Cloudflare AI Gateway endpoint
pub const AI_GATEWAY_HOST: &str = "https://gateway.ai.cloudflare.com/v1";

pub(crate) fn to_owned_list(models: &[&str]) -> Vec<String> {
    models.iter().map(|&m| m.to_owned()).collect()
}
