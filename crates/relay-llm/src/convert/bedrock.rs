//! Conversion between canonical types and the Bedrock text completion format

use crate::protocol::bedrock::{BedrockRequest, BedrockResponse, InvocationMetrics};
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, Choice, ChoiceMessage, FinishReason,
    Role, Usage,
};

/// Used when the caller does not bound the answer (the model requires it)
const DEFAULT_MAX_TOKENS_TO_SAMPLE: u32 = 2048;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

const HUMAN_PROMPT: &str = "\n\nHuman: ";
const ASSISTANT_PROMPT: &str = "\n\nAssistant: ";

impl From<&ChatCompletionRequest> for BedrockRequest {
    fn from(req: &ChatCompletionRequest) -> Self {
        Self {
            prompt: render_prompt(req),
            max_tokens_to_sample: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS_TO_SAMPLE),
            temperature: req.temperature,
            top_p: req.top_p,
            stop_sequences: req.stop.clone().unwrap_or_default(),
            anthropic_version: ANTHROPIC_VERSION.to_owned(),
        }
    }
}

/// Render messages as alternating turns ending with an open assistant turn
///
/// System messages lead the prompt, ahead of the first turn.
fn render_prompt(req: &ChatCompletionRequest) -> String {
    let mut prompt = String::new();

    for message in req.messages.iter().filter(|m| m.role == Role::System) {
        if !prompt.is_empty() {
            prompt.push('\n');
        }
        prompt.push_str(&message.content);
    }

    for message in &req.messages {
        match message.role {
            Role::System => continue,
            Role::User => prompt.push_str(HUMAN_PROMPT),
            Role::Assistant => prompt.push_str(ASSISTANT_PROMPT),
        }
        prompt.push_str(&message.content);
    }

    prompt.push_str(ASSISTANT_PROMPT.trim_end());
    prompt
}

fn finish_reason(stop_reason: Option<&str>) -> Option<FinishReason> {
    match stop_reason? {
        "max_tokens" => Some(FinishReason::Length),
        _ => Some(FinishReason::Stop),
    }
}

impl From<InvocationMetrics> for Usage {
    fn from(metrics: InvocationMetrics) -> Self {
        Self::new(metrics.input_token_count, metrics.output_token_count)
    }
}

/// Map a native response; `id` and `created` are minted by the caller
pub fn to_chat_completion(
    resp: BedrockResponse,
    id: String,
    model: &str,
    created: u64,
) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id,
        object: "chat.completion".to_owned(),
        created,
        model: model.to_owned(),
        choices: vec![Choice {
            index: 0,
            finish_reason: finish_reason(resp.stop_reason.as_deref()).or(Some(FinishReason::Stop)),
            message: ChoiceMessage::text(resp.completion),
        }],
        usage: resp.invocation_metrics.map(Usage::from),
    }
}

/// Map one streamed chunk; all chunks of one answer share `id`
pub fn to_stream_chunk(
    chunk: BedrockResponse,
    id: &str,
    model: &str,
    created: u64,
) -> ChatCompletionStreamResponse {
    let mut out = ChatCompletionStreamResponse::delta(
        id.to_owned(),
        model.to_owned(),
        created,
        chunk.completion,
        finish_reason(chunk.stop_reason.as_deref()),
    );
    out.usage = chunk.invocation_metrics.map(Usage::from);
    out
}
