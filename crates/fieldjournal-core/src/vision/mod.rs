//! Vision captioning: a chat-completions transport, persona prompts,
//! tolerant reply parsing and a retrying client that turns images into
//! suggestion bundles.

pub(crate) mod chat;
pub(crate) mod client;
pub(crate) mod parse;
pub(crate) mod prompt;
pub(crate) mod provider;
pub(crate) mod retry;

pub use chat::HttpVisionModel;
pub use client::{basic_keywords, VisionClient};
pub use parse::{parse_reply, strip_fences};
pub use prompt::{allowed_categories, BANNED_WORDS};
pub use provider::{
    ChatMessage, ChatReply, ChatRequest, ContentPart, ImageInput, MessageContent, VisionModel,
};
pub use retry::{backoff_duration, is_retryable, RetryPolicy};
