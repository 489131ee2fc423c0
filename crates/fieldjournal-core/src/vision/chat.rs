//! HTTP transport for OpenAI-compatible chat-completions endpoints.
//!
//! The request body is `{model, messages, max_tokens, temperature}` and the
//! reply text is read from `choices[0].message.content`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::provider::{ChatMessage, ChatReply, ChatRequest, VisionModel};
use crate::config::{resolve_env_var, VisionConfig};
use crate::error::VisionError;

/// Chat-completions model reached over HTTPS.
pub struct HttpVisionModel {
    endpoint: String,
    api_key: String,
    model: String,
    idempotency_header: Option<String>,
    /// Per-request deadline, reported in timeout errors
    timeout_ms: u64,
    client: reqwest::Client,
}

impl HttpVisionModel {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            idempotency_header: None,
            timeout_ms: 0,
            client: reqwest::Client::new(),
        }
    }

    /// Enforce a per-request deadline on the HTTP client.
    pub fn with_timeout(self, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Could not build vision HTTP client with a deadline: {e}");
                reqwest::Client::new()
            });
        Self {
            timeout_ms,
            client,
            ..self
        }
    }

    /// Build from configuration, resolving `${ENV_VAR}` secrets.
    pub fn from_config(config: &VisionConfig) -> Result<Self, VisionError> {
        let api_key = resolve_env_var(&config.api_key).ok_or_else(|| {
            VisionError::NotConfigured("vision API key not set (vision.api_key)".to_string())
        })?;
        let endpoint = resolve_env_var(&config.endpoint).ok_or_else(|| {
            VisionError::NotConfigured("vision endpoint not set (vision.endpoint)".to_string())
        })?;
        Ok(Self {
            idempotency_header: config.idempotency_header.clone(),
            ..Self::new(&endpoint, &api_key, &config.model).with_timeout(config.timeout_ms)
        })
    }
}

// --- Request types ---

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

// --- Response types ---

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Map a transport failure onto the retry taxonomy.
fn classify(e: reqwest::Error, timeout_ms: u64) -> VisionError {
    if e.is_timeout() {
        VisionError::Timeout { timeout_ms }
    } else if e.is_connect() || e.is_request() {
        VisionError::Network(e.to_string())
    } else if e.is_body() || e.is_decode() {
        VisionError::Aborted(e.to_string())
    } else {
        VisionError::Network(e.to_string())
    }
}

#[async_trait]
impl VisionModel for HttpVisionModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, VisionError> {
        let start = Instant::now();

        let body = WireRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        if let (Some(header), Some(key)) = (&self.idempotency_header, &request.idempotency_key) {
            builder = builder.header(header.as_str(), key.as_str());
        }

        let resp = builder.send().await.map_err(|e| classify(e, self.timeout_ms))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(VisionError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| classify(e, self.timeout_ms))?;
        let wire: WireResponse =
            serde_json::from_slice(&bytes).map_err(|e| VisionError::Decode(e.to_string()))?;

        let text = wire
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(VisionError::EmptyReply)?;

        Ok(ChatReply {
            text,
            model: wire.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: wire.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
