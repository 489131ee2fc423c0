//! Tolerant parsing of model replies into suggestion bundles.
//!
//! Models wrap JSON in markdown fences, invent categories and return
//! confidences outside [0, 1]. Nothing here fails: an unreadable reply
//! becomes an empty bundle.

use serde_json::Value;

use super::prompt::allowed_categories;
use crate::config::PromptVariant;
use crate::types::{KeywordCategory, KeywordSuggestion, SuggestionBundle, ValueSuggestion};

const ALT_TEXT_CONFIDENCE: f32 = 0.85;
const CAPTION_CONFIDENCE: f32 = 0.85;
const STORY_CONFIDENCE: f32 = 0.80;

/// Remove a surrounding markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest);
        s = s.strip_suffix("```").unwrap_or(s);
    }
    s.trim()
}

/// Parse an analysis reply.
///
/// Keywords with a non-string value, a non-numeric confidence or a category
/// outside the persona's set are dropped. Values are lowercased and trimmed,
/// confidences clamped to [0, 1].
pub fn parse_reply(text: &str, variant: PromptVariant, model: &str) -> SuggestionBundle {
    let mut bundle = SuggestionBundle::empty(model);

    let value: Value = match serde_json::from_str(strip_fences(text)) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) => {
            tracing::warn!("Vision reply is JSON but not an object");
            return bundle;
        }
        Err(e) => {
            tracing::warn!("Vision reply is not valid JSON: {e}");
            return bundle;
        }
    };

    let allowed = allowed_categories(variant);
    bundle.keywords = value
        .get("keywords")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|k| parse_keyword(k, allowed)).collect())
        .unwrap_or_default();

    if let Some(alt) = string_field(&value, "altText") {
        bundle.alt_text = ValueSuggestion::new(alt, ALT_TEXT_CONFIDENCE);
    }
    if let Some(caption) = string_field(&value, "caption") {
        bundle.caption = ValueSuggestion::new(caption, CAPTION_CONFIDENCE);
    }
    if let Some(story) = string_field(&value, "storyContext") {
        bundle.story_context = ValueSuggestion::new(story, STORY_CONFIDENCE);
    }

    bundle.technical_analysis = string_field(&value, "technicalAnalysis");
    bundle.composition_notes = string_field(&value, "compositionNotes");
    bundle.lighting_notes = string_field(&value, "lightingNotes");
    bundle
}

fn parse_keyword(item: &Value, allowed: &[KeywordCategory]) -> Option<KeywordSuggestion> {
    let value = item.get("value")?.as_str()?.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }
    let confidence = item.get("confidence")?.as_f64()?;
    let category = KeywordCategory::parse(item.get("category")?.as_str()?)?;
    if !allowed.contains(&category) {
        return None;
    }

    Some(KeywordSuggestion {
        value,
        category,
        confidence: (confidence as f32).clamp(0.0, 1.0),
        approved: false,
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Parse a JSON array of keyword strings, as returned for context prompts.
pub fn parse_keyword_list(text: &str) -> Option<Vec<String>> {
    let items: Vec<Value> = serde_json::from_str(strip_fences(text)).ok()?;
    let keywords: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    (!keywords.is_empty()).then_some(keywords)
}
