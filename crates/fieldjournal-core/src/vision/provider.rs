//! Vision model transport trait and chat request/response types.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::VisionError;

/// Base64-encoded image for inline (data URL) delivery.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg")
    pub media_type: String,
}

impl ImageInput {
    pub fn from_bytes(bytes: &[u8], media_type: &str) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL usable wherever an image URL is accepted.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Chat role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content: plain string or a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying an instruction and an image reference.
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }
}

/// A chat-completions request, independent of the transport.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Sent unchanged on every retry of the same logical request
    pub idempotency_key: Option<String>,
}

/// The text reply of a chat call.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Message content of the first choice
    pub text: String,
    /// Model identifier reported by the endpoint
    pub model: String,
    /// Total tokens, if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// A chat-completions capable vision model.
///
/// Uses `async_trait` so the client can hold `Arc<dyn VisionModel>` and tests
/// can substitute a scripted model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier recorded on suggestion bundles.
    fn model(&self) -> &str;

    /// Send one request. Deadlines and retries are applied by the caller.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, VisionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "image/jpeg");
        assert_eq!(input.data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_user_with_image_wire_shape() {
        let msg = ChatMessage::user_with_image("Analyze", "https://cdn.example/p.jpg");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "https://cdn.example/p.jpg");
    }

    #[test]
    fn test_system_message_is_plain_string() {
        let json = serde_json::to_value(ChatMessage::system("persona")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "persona");
    }
}
