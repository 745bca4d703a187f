//! Canonical request/response representation
//!
//! Every dialect converts to and from these types. Their JSON form is the
//! OpenAI-compatible chat completion schema, which keyed and Azure-style
//! upstreams speak natively.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;

pub use message::{Message, Role};
pub use request::ChatCompletionRequest;
pub use response::{ChatCompletionResponse, Choice, ChoiceMessage, FinishReason, Usage};
pub use stream::{ChatCompletionStreamResponse, StreamChoice, StreamDelta};
