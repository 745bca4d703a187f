use serde::{Deserialize, Serialize};

use super::response::{FinishReason, Usage};

/// One incremental chunk of a streamed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    /// Upstream response identifier, shared by all chunks of one answer
    #[serde(default)]
    pub id: String,
    /// Object type, `chat.completion.chunk`
    #[serde(default = "default_object")]
    pub object: String,
    /// Unix timestamp of creation
    #[serde(default)]
    pub created: u64,
    /// Model producing the answer
    #[serde(default)]
    pub model: String,
    /// Per-choice deltas; empty on a usage-only chunk
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    /// Usage totals, present on the final chunk when the upstream reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Delta for one choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: StreamDelta,
    /// Present on the terminal chunk
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Incremental message content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionStreamResponse {
    /// Single-choice text chunk
    pub fn delta(id: String, model: String, created: u64, content: String, finish_reason: Option<FinishReason>) -> Self {
        Self {
            id,
            object: default_object(),
            created,
            model,
            choices: vec![StreamChoice {
                index: 0,
                delta: StreamDelta {
                    role: None,
                    content: Some(content),
                },
                finish_reason,
            }],
            usage: None,
        }
    }

    /// Text added by this chunk (first choice), empty when there is none
    pub fn completion_delta(&self) -> &str {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .unwrap_or_default()
    }

    /// Whether this chunk closes the answer
    pub fn is_done(&self) -> bool {
        self.choices.iter().any(|choice| choice.finish_reason.is_some())
    }
}

fn default_object() -> String {
    "chat.completion.chunk".to_owned()
}
