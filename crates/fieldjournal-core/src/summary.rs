//! Gallery introductions synthesised from photo text.
//!
//! The generator never fails: a gallery without any text gets a fixed
//! sentence without calling the model, and a failed model call gets a
//! second fixed paragraph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Gallery, Photo};
use crate::vision::VisionClient;

const SYSTEM_PROMPT: &str = "You are the senior travel editor of a prestige print publication. \
You will receive field notes and image descriptions from one photographic project. \
Write a narrative introduction of about 150 words that conveys the atmosphere of the place, \
its cultural significance and the emotional core of the journey. \
Write as an observer with an ethnographic eye. Keep the tone measured and precise, \
and leave out marketing clichés and superlatives. Reply with the introduction only.";

const DEFAULT_DESCRIPTION: &str = "A photographic journey";

/// Voice of the introduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Narrative,
    Poetic,
    Informative,
    Ethnographic,
}

impl SummaryStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::Poetic => "poetic",
            Self::Informative => "informative",
            Self::Ethnographic => "ethnographic",
        }
    }
}

impl std::str::FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "narrative" => Ok(Self::Narrative),
            "poetic" => Ok(Self::Poetic),
            "informative" => Ok(Self::Informative),
            "ethnographic" => Ok(Self::Ethnographic),
            other => Err(format!(
                "unknown summary style '{other}' (expected narrative, poetic, informative or ethnographic)"
            )),
        }
    }
}

/// Which fixed text replaced a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFallback {
    /// No photo had any text; the model was not called
    NoText,
    /// The model call failed or returned nothing
    ModelError,
}

/// A generated gallery introduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GallerySummary {
    pub intro: String,
    pub tokens_used: u32,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<SummaryFallback>,
}

impl GallerySummary {
    fn fallback(intro: String, kind: SummaryFallback) -> Self {
        Self {
            intro,
            tokens_used: 0,
            generated_at: Utc::now(),
            fallback: Some(kind),
        }
    }
}

/// Fallback when no photo has any text.
pub fn no_text_fallback(gallery_name: &str) -> String {
    format!("This {gallery_name} collection captures the essence of the journey through a visual narrative.")
}

/// Fallback when the model call fails.
pub fn model_error_fallback(gallery_name: &str) -> String {
    format!(
        "This {gallery_name} collection presents a nuanced exploration of place and culture. \
Through careful observation, these images document the subtle interactions between environment \
and experience. The work reflects a commitment to authentic representation without the \
embellishment of conventional travel photography."
    )
}

/// One `Image N: ...` line per photo with text, numbered after filtering.
pub fn story_entries(photos: &[Photo]) -> Vec<String> {
    photos
        .iter()
        .filter(|p| p.has_story_text())
        .enumerate()
        .map(|(i, photo)| {
            let mut entry = format!("Image {}:", i + 1);
            let parts = [
                ("Location", &photo.location),
                ("Field Note", &photo.field_journal),
                ("Caption", &photo.caption),
            ];
            for (label, value) in parts {
                if let Some(text) = value.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                    entry.push_str(&format!(" {label}: {text}."));
                }
            }
            entry
        })
        .collect()
}

fn user_prompt(gallery_name: &str, description: Option<&str>, entries: &[String], style: SummaryStyle) -> String {
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION);
    format!(
        "Project: {gallery_name}\nDescription: {description}\n\nField notes and descriptions:\n{}\n\n\
Write a 150-word introduction for this gallery. Style: {}",
        entries.join("\n\n"),
        style.as_str()
    )
}

/// Writes gallery introductions with the vision model's text endpoint.
#[derive(Clone)]
pub struct SummaryGenerator {
    vision: Option<VisionClient>,
}

impl SummaryGenerator {
    /// Without a client every gallery with text gets the error fallback.
    pub fn new(vision: Option<VisionClient>) -> Self {
        Self { vision }
    }

    pub async fn summarize(&self, gallery: &Gallery, photos: &[Photo], style: SummaryStyle) -> GallerySummary {
        let name = gallery.title.as_str();
        let entries = story_entries(photos);
        if entries.is_empty() {
            tracing::debug!("Gallery {name} has no photo text, using the fixed introduction");
            return GallerySummary::fallback(no_text_fallback(name), SummaryFallback::NoText);
        }

        let Some(vision) = &self.vision else {
            tracing::warn!("No vision model configured, using the fallback introduction for {name}");
            return GallerySummary::fallback(model_error_fallback(name), SummaryFallback::ModelError);
        };

        let prompt = user_prompt(name, gallery.description.as_deref(), &entries, style);
        match vision.complete_text(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) if !reply.text.trim().is_empty() => {
                tracing::info!(
                    "Generated {} introduction for {name} from {} photos",
                    style.as_str(),
                    entries.len()
                );
                GallerySummary {
                    intro: reply.text.trim().to_string(),
                    tokens_used: reply.tokens_used.unwrap_or(0),
                    generated_at: Utc::now(),
                    fallback: None,
                }
            }
            Ok(_) => {
                tracing::warn!("Empty summary reply for {name}, using the fallback introduction");
                GallerySummary::fallback(model_error_fallback(name), SummaryFallback::ModelError)
            }
            Err(e) => {
                tracing::warn!("Failed to generate summary for {name}: {e}");
                GallerySummary::fallback(model_error_fallback(name), SummaryFallback::ModelError)
            }
        }
    }

    /// Summaries for several galleries, one after another.
    pub async fn summarize_batch(
        &self,
        galleries: &[(Gallery, Vec<Photo>)],
        style: SummaryStyle,
    ) -> Vec<(Uuid, GallerySummary)> {
        let mut summaries = Vec::with_capacity(galleries.len());
        for (gallery, photos) in galleries {
            let summary = self.summarize(gallery, photos, style).await;
            summaries.push((gallery.id, summary));
        }
        summaries
    }
}
