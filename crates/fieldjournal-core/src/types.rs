//! Core domain types: galleries, photos, extracted metadata and AI suggestions.
//!
//! These are the shapes the admin UI works with (camelCase on the wire).
//! Database rows live in `store::rows` and are mapped to and from these.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// === Galleries ===

/// A named, orderable collection of photos with its own publish state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub id: Uuid,
    pub title: String,
    /// Unique, URL-safe, derived from the title
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_thumbnail_url: Option<String>,
    /// Free-text project brief handed to the vision model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_context: Option<String>,
    pub is_published: bool,
    /// Inactive galleries are hidden from every listing
    pub is_active: bool,
    #[serde(default)]
    pub visibility: VisibilitySettings,
    #[serde(default)]
    pub seo: SeoSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Gallery {
    /// Whether the gallery may appear in any listing.
    pub fn is_listed(&self) -> bool {
        self.is_active
    }

    /// Prompt context for the vision model.
    pub fn context(&self) -> GalleryContext {
        GalleryContext {
            title: self.title.clone(),
            description: self.description.clone(),
            project_context: self.project_context.clone(),
        }
    }
}

/// Display settings stored as JSON on the gallery row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilitySettings {
    pub is_public: bool,
    pub show_on_homepage: bool,
    pub layout: GalleryLayout,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            is_public: true,
            show_on_homepage: false,
            layout: GalleryLayout::Grid,
        }
    }
}

/// Public viewer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryLayout {
    #[default]
    Grid,
    Masonry,
    Filmstrip,
    Scatter,
}

/// SEO settings stored as JSON on the gallery row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeoSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    pub keywords: Vec<String>,
}

/// Fields for creating a gallery. The slug is derived from the title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGallery {
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub project_context: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub visibility: VisibilitySettings,
    #[serde(default)]
    pub seo: SeoSettings,
}

/// Partial gallery update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub project_context: Option<String>,
    pub is_published: Option<bool>,
    pub is_active: Option<bool>,
    pub visibility: Option<VisibilitySettings>,
    pub seo: Option<SeoSettings>,
}

/// Gallery information the vision model sees alongside each image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryContext {
    pub title: String,
    pub description: Option<String>,
    pub project_context: Option<String>,
}

/// Turn a title into a URL-safe slug.
///
/// Lowercases, drops everything outside `[a-z0-9 -]`, collapses whitespace
/// and repeated hyphens, and trims hyphens from both ends.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            last_hyphen = false;
        } else if (c.is_whitespace() || c == '-') && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// === Photos ===

/// A photo owned by exactly one gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub gallery_id: Uuid,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Narrative field-journal text (the "story context")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PhotoCategory>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 1-based render position within the gallery
    pub display_order: i32,
    pub is_published: bool,
    pub is_featured: bool,
    #[serde(default)]
    pub telemetry: Telemetry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<SuggestionBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Whether the photo carries any text a gallery summary could use.
    pub fn has_story_text(&self) -> bool {
        [&self.location, &self.field_journal, &self.caption]
            .iter()
            .any(|field| field.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Fields for inserting a photo row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub gallery_id: Uuid,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub field_journal: Option<String>,
    pub location: Option<String>,
    pub category: Option<PhotoCategory>,
    pub tags: Vec<String>,
    pub display_order: i32,
    pub is_published: bool,
    pub exif: Option<ExifData>,
    pub gps: Option<GpsData>,
    pub ai_suggestions: Option<SuggestionBundle>,
    pub date_taken: Option<NaiveDateTime>,
}

/// Partial photo update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPatch {
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub field_journal: Option<String>,
    pub location: Option<String>,
    pub category: Option<PhotoCategory>,
    pub tags: Option<Vec<String>>,
    pub display_order: Option<i32>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    pub ai_suggestions: Option<SuggestionBundle>,
}

impl PhotoPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to a local copy of the photo.
    pub fn apply_to(&self, photo: &mut Photo) {
        if let Some(v) = &self.alt_text {
            photo.alt_text = Some(v.clone());
        }
        if let Some(v) = &self.caption {
            photo.caption = Some(v.clone());
        }
        if let Some(v) = &self.field_journal {
            photo.field_journal = Some(v.clone());
        }
        if let Some(v) = &self.location {
            photo.location = Some(v.clone());
        }
        if let Some(v) = self.category {
            photo.category = Some(v);
        }
        if let Some(v) = &self.tags {
            photo.tags = v.clone();
        }
        if let Some(v) = self.display_order {
            photo.display_order = v;
        }
        if let Some(v) = self.is_published {
            photo.is_published = v;
        }
        if let Some(v) = self.is_featured {
            photo.is_featured = v;
        }
        if let Some(v) = &self.ai_suggestions {
            photo.ai_suggestions = Some(v.clone());
        }
    }
}

/// Gallery-level photo category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoCategory {
    Wildlife,
    Landscape,
    Culture,
    Accommodation,
    Food,
    Activity,
    People,
    Aerial,
}

impl PhotoCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "wildlife" => Some(Self::Wildlife),
            "landscape" => Some(Self::Landscape),
            "culture" => Some(Self::Culture),
            "accommodation" => Some(Self::Accommodation),
            "food" => Some(Self::Food),
            "activity" => Some(Self::Activity),
            "people" => Some(Self::People),
            "aerial" => Some(Self::Aerial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wildlife => "wildlife",
            Self::Landscape => "landscape",
            Self::Culture => "culture",
            Self::Accommodation => "accommodation",
            Self::Food => "food",
            Self::Activity => "activity",
            Self::People => "people",
            Self::Aerial => "aerial",
        }
    }
}

/// Engagement counters. Under normal operation they never decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub views: u64,
    pub likes: u64,
    pub shares: u64,
    pub downloads: u64,
}

/// One entry of a bulk reorder: `{id, displayOrder}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoOrder {
    pub id: Uuid,
    pub display_order: i32,
}

// === Extracted metadata ===

/// Camera and exposure metadata, derived once at upload time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    /// e.g. "f/1.8"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    /// e.g. "1/500" or "2s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutter_speed: Option<String>,
    /// e.g. "50mm"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length_35mm: Option<u32>,
    /// e.g. "+0.7 EV"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_compensation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metering_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,
}

impl ExifData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// GPS position in decimal degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsData {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters, negative below sea level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude_ref: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude_ref: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_ref: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_date: Option<String>,
    /// "HH:MM:SS"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_time: Option<String>,
    pub processing_method: GpsSource,
}

/// Where a GPS position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpsSource {
    #[default]
    Exif,
    Manual,
    Estimated,
}

/// Result of GPS extraction: `gps` is `Some` exactly when `has_gps` is true.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsExtraction {
    pub gps: Option<GpsData>,
    pub has_gps: bool,
}

impl GpsExtraction {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(gps: GpsData) -> Self {
        Self {
            gps: Some(gps),
            has_gps: true,
        }
    }
}

// === AI suggestions ===

/// Keyword category. The allowed subset depends on the prompt variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCategory {
    Topographical,
    Observational,
    Technical,
    Wildlife,
    Landscape,
    Artistic,
    Emotional,
    Location,
}

impl KeywordCategory {
    /// Parse a category name (case-insensitive, surrounding whitespace ignored).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "topographical" => Some(Self::Topographical),
            "observational" => Some(Self::Observational),
            "technical" => Some(Self::Technical),
            "wildlife" => Some(Self::Wildlife),
            "landscape" => Some(Self::Landscape),
            "artistic" => Some(Self::Artistic),
            "emotional" => Some(Self::Emotional),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topographical => "topographical",
            Self::Observational => "observational",
            Self::Technical => "technical",
            Self::Wildlife => "wildlife",
            Self::Landscape => "landscape",
            Self::Artistic => "artistic",
            Self::Emotional => "emotional",
            Self::Location => "location",
        }
    }
}

/// A suggested keyword awaiting operator approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSuggestion {
    pub value: String,
    pub category: KeywordCategory,
    /// Always within [0, 1]
    pub confidence: f32,
    pub approved: bool,
}

/// A suggested text value awaiting operator approval.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSuggestion {
    pub value: String,
    pub confidence: f32,
    pub approved: bool,
    #[serde(default)]
    pub edited: bool,
}

impl ValueSuggestion {
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: value.into(),
            confidence,
            approved: false,
            edited: false,
        }
    }
}

/// Approvable single-value fields of a suggestion bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionField {
    AltText,
    Caption,
    StoryContext,
}

/// Structured output of the vision model for one photo.
///
/// Created by the vision client, mutated only by operator approval, and
/// persisted to the photo once individual fields are approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionBundle {
    pub keywords: Vec<KeywordSuggestion>,
    pub alt_text: ValueSuggestion,
    pub caption: ValueSuggestion,
    pub story_context: ValueSuggestion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting_notes: Option<String>,
    pub model: String,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

impl SuggestionBundle {
    /// An all-empty bundle with zero confidence everywhere.
    pub fn empty(model: impl Into<String>) -> Self {
        Self {
            keywords: Vec::new(),
            alt_text: ValueSuggestion::default(),
            caption: ValueSuggestion::default(),
            story_context: ValueSuggestion::default(),
            technical_analysis: None,
            composition_notes: None,
            lighting_notes: None,
            model: model.into(),
            processed_at: Utc::now(),
            tokens_used: None,
        }
    }

    /// True when the model produced nothing usable.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.alt_text.value.is_empty()
            && self.caption.value.is_empty()
            && self.story_context.value.is_empty()
    }

    fn field_mut(&mut self, field: SuggestionField) -> &mut ValueSuggestion {
        match field {
            SuggestionField::AltText => &mut self.alt_text,
            SuggestionField::Caption => &mut self.caption,
            SuggestionField::StoryContext => &mut self.story_context,
        }
    }

    /// Mark a value suggestion as approved by the operator.
    pub fn approve(&mut self, field: SuggestionField) {
        self.field_mut(field).approved = true;
    }

    /// Replace a suggested value with operator text; edited values count as approved.
    pub fn edit(&mut self, field: SuggestionField, value: impl Into<String>) {
        let suggestion = self.field_mut(field);
        suggestion.value = value.into();
        suggestion.edited = true;
        suggestion.approved = true;
    }

    /// Approve the keyword at `index`. Returns false if out of range.
    pub fn approve_keyword(&mut self, index: usize) -> bool {
        match self.keywords.get_mut(index) {
            Some(keyword) => {
                keyword.approved = true;
                true
            }
            None => false,
        }
    }

    /// Photo patch carrying only the approved fields, plus the bundle itself.
    pub fn approved_patch(&self) -> PhotoPatch {
        let approved = |s: &ValueSuggestion| (s.approved && !s.value.is_empty()).then(|| s.value.clone());
        let approved_keywords: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| k.approved)
            .map(|k| k.value.clone())
            .collect();

        PhotoPatch {
            alt_text: approved(&self.alt_text),
            caption: approved(&self.caption),
            field_journal: approved(&self.story_context),
            tags: (!approved_keywords.is_empty()).then_some(approved_keywords),
            ai_suggestions: Some(self.clone()),
            ..PhotoPatch::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> SuggestionBundle {
        let mut bundle = SuggestionBundle::empty("test-model");
        bundle.alt_text = ValueSuggestion::new("Lioness resting under acacia", 0.85);
        bundle.caption = ValueSuggestion::new("Lioness, Serengeti, late afternoon", 0.85);
        bundle.story_context = ValueSuggestion::new("Late afternoon observation.", 0.8);
        bundle.keywords = vec![
            KeywordSuggestion {
                value: "arid-savanna".to_string(),
                category: KeywordCategory::Topographical,
                confidence: 0.9,
                approved: false,
            },
            KeywordSuggestion {
                value: "golden-hour".to_string(),
                category: KeywordCategory::Technical,
                confidence: 0.7,
                approved: false,
            },
        ];
        bundle
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Varanasi: The Ghats at Dawn"), "varanasi-the-ghats-at-dawn");
        assert_eq!(slugify("  Serengeti   2024 "), "serengeti-2024");
        assert_eq!(slugify("--Ngorongoro -- Crater--"), "ngorongoro-crater");
        assert_eq!(slugify("Émigré Café"), "migr-caf");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_keyword_category_parse() {
        assert_eq!(
            KeywordCategory::parse(" Topographical "),
            Some(KeywordCategory::Topographical)
        );
        assert_eq!(KeywordCategory::parse("WILDLIFE"), Some(KeywordCategory::Wildlife));
        assert_eq!(KeywordCategory::parse("fluff"), None);
    }

    #[test]
    fn test_empty_bundle_is_empty() {
        let bundle = SuggestionBundle::empty("m");
        assert!(bundle.is_empty());
        assert_eq!(bundle.alt_text.confidence, 0.0);
        assert!(!sample_bundle().is_empty());
    }

    #[test]
    fn test_approved_patch_only_carries_approved_fields() {
        let mut bundle = sample_bundle();
        bundle.approve(SuggestionField::AltText);
        assert!(bundle.approve_keyword(1));
        assert!(!bundle.approve_keyword(9));

        let patch = bundle.approved_patch();
        assert_eq!(patch.alt_text.as_deref(), Some("Lioness resting under acacia"));
        assert!(patch.caption.is_none());
        assert!(patch.field_journal.is_none());
        assert_eq!(patch.tags, Some(vec!["golden-hour".to_string()]));
        assert!(patch.ai_suggestions.is_some());
    }

    #[test]
    fn test_edit_marks_approved() {
        let mut bundle = sample_bundle();
        bundle.edit(SuggestionField::StoryContext, "Rewritten by the editor.");
        let patch = bundle.approved_patch();
        assert_eq!(patch.field_journal.as_deref(), Some("Rewritten by the editor."));
        assert!(bundle.story_context.edited);
    }

    #[test]
    fn test_bundle_serde_camel_case() {
        let json = serde_json::to_string(&sample_bundle()).unwrap();
        assert!(json.contains("\"altText\""));
        assert!(json.contains("\"storyContext\""));
        assert!(json.contains("\"category\":\"topographical\""));
        assert!(!json.contains("technicalAnalysis"));
    }

    #[test]
    fn test_photo_order_wire_shape() {
        let order = PhotoOrder {
            id: Uuid::nil(),
            display_order: 3,
        };
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"displayOrder\":3"));
    }

    #[test]
    fn test_photo_patch_is_empty() {
        assert!(PhotoPatch::default().is_empty());
        let patch = PhotoPatch {
            is_featured: Some(true),
            ..PhotoPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
