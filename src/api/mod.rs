//! Client for the completion relay.
//!
//! The relay accepts `{model, messages, referer}` and answers with an
//! OpenAI-style server-sent-event stream of chat completion chunks.

mod client;
mod http;
mod prompts;
mod sse;
mod types;

pub use client::{CompletionClient, TokenStream};
pub use http::RetryPolicy;
pub use prompts::{
    build_messages, serialize_project, PromptMode, CREATION_SYSTEM_PROMPT,
    MODIFICATION_SYSTEM_PROMPT,
};
pub use sse::{SseDecoder, SseEvent};
pub use types::{ApiError, ApiStatus, ChatMessage, CompletionChunk, GenerateRequest, Role};
