//! Claude-on-Bedrock text completion wire format

use serde::{Deserialize, Serialize};

/// Body of an `invoke` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedrockRequest {
    /// Conversation rendered as `Human:`/`Assistant:` turns
    pub prompt: String,
    /// Maximum tokens to generate (required by the model)
    pub max_tokens_to_sample: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    /// Messages API version pinned by Bedrock
    pub anthropic_version: String,
}

/// Response body, and the shape of each streamed chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedrockResponse {
    /// Generated text (a delta when streaming)
    #[serde(default)]
    pub completion: String,
    /// `stop_sequence`, `max_tokens` or `end_turn`; absent mid-stream
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Stop sequence that ended generation
    #[serde(default)]
    pub stop: Option<String>,
    /// Token counts, attached to the final chunk
    #[serde(
        rename = "amazon-bedrock-invocationMetrics",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub invocation_metrics: Option<InvocationMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationMetrics {
    #[serde(default)]
    pub input_token_count: u32,
    #[serde(default)]
    pub output_token_count: u32,
    #[serde(default)]
    pub invocation_latency: u64,
    #[serde(default)]
    pub first_byte_latency: u64,
}
