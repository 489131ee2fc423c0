//! Vision captioning client: prompts, deadlines, retries and parsing over a
//! [`VisionModel`] transport.

use std::sync::Arc;
use std::time::Duration;

use super::chat::HttpVisionModel;
use super::parse::{parse_keyword_list, parse_reply};
use super::prompt::{analysis_instruction, keyword_prompt, system_prompt};
use super::provider::{ChatMessage, ChatReply, ChatRequest, VisionModel};
use super::retry::RetryPolicy;
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::types::{GalleryContext, SuggestionBundle};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "in", "on", "at", "with", "and", "or", "of", "for", "to",
];

const MAX_KEYWORDS: usize = 10;

/// Produces suggestion bundles for images and free text completions.
#[derive(Clone)]
pub struct VisionClient {
    model: Arc<dyn VisionModel>,
    config: VisionConfig,
    policy: RetryPolicy,
}

impl VisionClient {
    pub fn new(model: Arc<dyn VisionModel>, config: VisionConfig) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            model,
            config,
            policy,
        }
    }

    /// Client over the configured HTTP endpoint.
    pub fn from_config(config: &VisionConfig) -> Result<Self, VisionError> {
        let model = HttpVisionModel::from_config(config)?;
        Ok(Self::new(Arc::new(model), config.clone()))
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            idempotency_key: self
                .config
                .idempotency_header
                .as_ref()
                .map(|_| uuid::Uuid::new_v4().to_string()),
        }
    }

    fn analysis_request(&self, image_url: &str, context: &GalleryContext) -> ChatRequest {
        self.request(vec![
            ChatMessage::system(system_prompt(self.config.prompt_variant)),
            ChatMessage::user_with_image(analysis_instruction(context), image_url),
        ])
    }

    fn to_bundle(&self, reply: ChatReply) -> SuggestionBundle {
        let mut bundle = parse_reply(&reply.text, self.config.prompt_variant, self.model.model());
        bundle.tokens_used = reply.tokens_used;
        tracing::debug!(
            "Vision reply: {} keywords, {}ms",
            bundle.keywords.len(),
            reply.latency_ms
        );
        bundle
    }

    async fn send(&self, request: &ChatRequest, policy: RetryPolicy) -> Result<ChatReply, VisionError> {
        policy.run(|_| self.model.complete(request)).await
    }

    /// Analyze one image with a single deadline-bounded attempt.
    ///
    /// Transport failures are returned. A reply that cannot be parsed yields
    /// an empty bundle instead of an error.
    pub async fn analyze(
        &self,
        image_url: &str,
        context: &GalleryContext,
    ) -> Result<SuggestionBundle, VisionError> {
        let request = self.analysis_request(image_url, context);
        let reply = self.send(&request, self.policy.single_attempt()).await?;
        Ok(self.to_bundle(reply))
    }

    /// Analyze one image, retrying transient failures with backoff.
    ///
    /// The same idempotency key is sent on every attempt.
    pub async fn analyze_with_retry(
        &self,
        image_url: &str,
        context: &GalleryContext,
    ) -> Result<SuggestionBundle, VisionError> {
        let request = self.analysis_request(image_url, context);
        let reply = self.send(&request, self.policy).await?;
        Ok(self.to_bundle(reply))
    }

    /// Analyze images one after another with a pause between calls.
    ///
    /// A failed item yields an empty bundle; the batch never aborts.
    /// `on_progress(done, total)` fires after each item.
    pub async fn analyze_batch<F>(
        &self,
        image_urls: &[String],
        context: &GalleryContext,
        mut on_progress: F,
    ) -> Vec<SuggestionBundle>
    where
        F: FnMut(usize, usize),
    {
        let total = image_urls.len();
        let delay = Duration::from_millis(self.config.batch_delay_ms);
        let mut bundles = Vec::with_capacity(total);

        for (i, url) in image_urls.iter().enumerate() {
            let bundle = match self.analyze_with_retry(url, context).await {
                Ok(bundle) => bundle,
                Err(e) => {
                    tracing::warn!("Analysis failed for {url}: {e}");
                    SuggestionBundle::empty(self.model.model())
                }
            };
            bundles.push(bundle);
            on_progress(i + 1, total);

            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        bundles
    }

    /// Text-only completion with the retry policy applied.
    pub async fn complete_text(&self, system: &str, user: &str) -> Result<ChatReply, VisionError> {
        let request = self.request(vec![ChatMessage::system(system), ChatMessage::user(user)]);
        self.send(&request, self.policy).await
    }

    /// Suggest keywords from existing photo text, without the image.
    ///
    /// Falls back to [`basic_keywords`] when the model fails or replies with
    /// something other than a JSON array.
    pub async fn suggest_keywords(
        &self,
        caption: &str,
        location: Option<&str>,
        category: Option<&str>,
    ) -> Vec<String> {
        let request = self.request(vec![ChatMessage::user(keyword_prompt(caption, location, category))]);
        match self.send(&request, self.policy).await {
            Ok(reply) => match parse_keyword_list(&reply.text) {
                Some(mut keywords) => {
                    dedup_in_order(&mut keywords);
                    keywords.truncate(MAX_KEYWORDS);
                    keywords
                }
                None => basic_keywords(caption, location, category),
            },
            Err(e) => {
                tracing::warn!("Keyword suggestion failed, using basic keywords: {e}");
                basic_keywords(caption, location, category)
            }
        }
    }
}

/// Keywords derived from text alone.
///
/// Category first, then a slug of the location, then significant caption
/// words, then the two house terms. Deduplicated, at most ten.
pub fn basic_keywords(caption: &str, location: Option<&str>, category: Option<&str>) -> Vec<String> {
    let mut keywords = Vec::new();

    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        keywords.push(category.to_lowercase());
    }

    if let Some(location) = location {
        let slug = location
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if !slug.is_empty() {
            keywords.push(slug);
        }
    }

    for word in caption.split_whitespace() {
        let cleaned: String = word
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase())
            .collect();
        if cleaned.len() > 3 && !STOPWORDS.contains(&cleaned.as_str()) {
            keywords.push(cleaned);
        }
    }

    keywords.push("documentary".to_string());
    keywords.push("photojournalism".to_string());

    dedup_in_order(&mut keywords);
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
