//! Prompt text for image analysis and keyword suggestion.

use crate::config::PromptVariant;
use crate::types::{GalleryContext, KeywordCategory};

/// Words a caption must never lean on.
pub const BANNED_WORDS: &[&str] = &[
    "beautiful",
    "stunning",
    "breathtaking",
    "aesthetic",
    "cinematic",
    "mesmerizing",
    "ethereal",
    "serene",
    "peaceful",
    "tranquil",
    "amazing",
    "incredible",
    "wonderful",
    "spectacular",
    "gorgeous",
    "magical",
    "divine",
    "soul-stirring",
    "heart-warming",
];

const OUTPUT_SHAPE: &str = r#"Reply with one JSON object and nothing else:
{
  "keywords": [{"value": "...", "category": "...", "confidence": 0.0}],
  "altText": "...",
  "caption": "...",
  "storyContext": "...",
  "technicalAnalysis": "...",
  "compositionNotes": "...",
  "lightingNotes": "..."
}"#;

/// Keyword categories the model may use for a persona.
pub fn allowed_categories(variant: PromptVariant) -> &'static [KeywordCategory] {
    match variant {
        PromptVariant::FieldJournal => &[
            KeywordCategory::Topographical,
            KeywordCategory::Observational,
            KeywordCategory::Technical,
        ],
        PromptVariant::Safari => &[
            KeywordCategory::Wildlife,
            KeywordCategory::Landscape,
            KeywordCategory::Technical,
            KeywordCategory::Artistic,
            KeywordCategory::Emotional,
            KeywordCategory::Location,
        ],
    }
}

/// System prompt for the selected persona.
pub fn system_prompt(variant: PromptVariant) -> String {
    match variant {
        PromptVariant::FieldJournal => field_journal_prompt(),
        PromptVariant::Safari => safari_prompt(),
    }
}

fn category_list(variant: PromptVariant) -> String {
    allowed_categories(variant)
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn field_journal_prompt() -> String {
    format!(
        "You are the picture desk lead of a documentary field journal. You describe \
photographs the way a working ecologist or ethnographer writes up a day in the field: \
specific, physical, unhurried, never promotional.

KEYWORDS
Return 10 to 12 keywords. Every keyword belongs to exactly one category:
- \"topographical\": terrain, landforms, water, vegetation zones, the shape of the ground.
- \"observational\": what people or animals are doing, traces of use, the event in progress.
- \"technical\": light, texture, lens and exposure character, surface and material.
Prefer hyphenated compound terms (\"wind-scoured-ridge\", \"late-afternoon-rim-light\") \
over single generic nouns. Give each keyword a confidence between 0 and 1.

LANGUAGE
Do not use any of these words anywhere: {banned}.
Name what is visible instead of how it should feel.

FIELDS
- altText: 60 to 120 characters. Literal description for screen readers.
- caption: 80 to 150 characters. One observed fact plus one piece of context.
- storyContext: a first-person field record, two to four sentences, as if written in a \
notebook the same evening.
- technicalAnalysis, compositionNotes, lightingNotes: one sentence each, optional.

{shape}",
        banned = BANNED_WORDS.join(", "),
        shape = OUTPUT_SHAPE,
    )
}

fn safari_prompt() -> String {
    format!(
        "You are a wildlife and travel photo editor preparing captions for a safari \
portfolio. Identify species, behaviour and habitat where you can, and say so plainly \
when you cannot.

KEYWORDS
Return 10 to 12 keywords using only these categories: {categories}. Give each keyword \
a confidence between 0 and 1.

LANGUAGE
Avoid these words: {banned}.

FIELDS
- altText: 60 to 120 characters describing the subject and setting.
- caption: 80 to 150 characters naming the subject and what it is doing.
- storyContext: two or three sentences on the moment and the place.
- technicalAnalysis, compositionNotes, lightingNotes: optional, one sentence each.

{shape}",
        categories = category_list(PromptVariant::Safari),
        banned = BANNED_WORDS.join(", "),
        shape = OUTPUT_SHAPE,
    )
}

/// User instruction accompanying the image, carrying the gallery context.
pub fn analysis_instruction(context: &GalleryContext) -> String {
    let mut text = String::from("Analyze this photograph");
    if !context.title.trim().is_empty() {
        text.push_str(&format!(" from the gallery \"{}\"", context.title.trim()));
    }
    text.push('.');

    if let Some(description) = non_empty(context.description.as_deref()) {
        text.push_str(&format!("\nGallery description: {description}"));
    }
    if let Some(project) = non_empty(context.project_context.as_deref()) {
        text.push_str(&format!("\nProject notes: {project}"));
    }
    text.push_str("\nReturn the metadata object exactly as specified.");
    text
}

/// Prompt asking for keywords from existing text when no image is available.
pub fn keyword_prompt(caption: &str, location: Option<&str>, category: Option<&str>) -> String {
    let mut text = String::from(
        "Suggest 10 search keywords for a documentary photograph, using only the notes below.\n",
    );
    text.push_str(&format!("Caption: {caption}\n"));
    if let Some(location) = non_empty(location) {
        text.push_str(&format!("Location: {location}\n"));
    }
    if let Some(category) = non_empty(category) {
        text.push_str(&format!("Category: {category}\n"));
    }
    text.push_str(&format!(
        "Use lowercase, hyphenate compound terms, avoid: {}.\n\
Reply with a JSON array of strings only.",
        BANNED_WORDS.join(", ")
    ));
    text
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
