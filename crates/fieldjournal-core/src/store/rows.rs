//! Database row shapes (snake_case) and their mapping to domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    ExifData, Gallery, GalleryLayout, GalleryPatch, GpsData, NewGallery, NewPhoto, Photo,
    PhotoCategory, PhotoPatch, SeoSettings, SuggestionBundle, Telemetry, VisibilitySettings,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityRow {
    pub is_public: Option<bool>,
    pub show_on_homepage: Option<bool>,
    pub layout: Option<GalleryLayout>,
}

impl From<VisibilityRow> for VisibilitySettings {
    fn from(row: VisibilityRow) -> Self {
        let defaults = VisibilitySettings::default();
        Self {
            is_public: row.is_public.unwrap_or(defaults.is_public),
            show_on_homepage: row.show_on_homepage.unwrap_or(defaults.show_on_homepage),
            layout: row.layout.unwrap_or(defaults.layout),
        }
    }
}

impl From<&VisibilitySettings> for VisibilityRow {
    fn from(v: &VisibilitySettings) -> Self {
        Self {
            is_public: Some(v.is_public),
            show_on_homepage: Some(v.show_on_homepage),
            layout: Some(v.layout),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    pub keywords: Vec<String>,
}

impl From<SeoRow> for SeoSettings {
    fn from(row: SeoRow) -> Self {
        Self {
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            keywords: row.keywords,
        }
    }
}

impl From<&SeoSettings> for SeoRow {
    fn from(s: &SeoSettings) -> Self {
        Self {
            meta_title: s.meta_title.clone(),
            meta_description: s.meta_description.clone(),
            keywords: s.keywords.clone(),
        }
    }
}

/// A `galleries` row as returned by the REST interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub cover_thumbnail_url: Option<String>,
    pub project_context: Option<String>,
    #[serde(default)]
    pub visibility_settings: Option<VisibilityRow>,
    #[serde(default)]
    pub seo_settings: Option<SeoRow>,
    pub is_published: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl From<GalleryRow> for Gallery {
    fn from(row: GalleryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            cover_image_url: row.cover_image_url,
            cover_thumbnail_url: row.cover_thumbnail_url,
            project_context: row.project_context,
            is_published: row.is_published,
            is_active: row.is_active,
            visibility: row.visibility_settings.unwrap_or_default().into(),
            seo: row.seo_settings.unwrap_or_default().into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
        }
    }
}

/// Insert body for `galleries`.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryInsert {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub project_context: Option<String>,
    pub visibility_settings: VisibilityRow,
    pub seo_settings: SeoRow,
    pub is_published: bool,
    pub is_active: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl GalleryInsert {
    pub fn new(gallery: &NewGallery, slug: &str) -> Self {
        Self {
            title: gallery.title.trim().to_string(),
            slug: slug.to_string(),
            description: gallery.description.clone(),
            cover_image_url: gallery.cover_image_url.clone(),
            project_context: gallery.project_context.clone(),
            visibility_settings: (&gallery.visibility).into(),
            seo_settings: (&gallery.seo).into(),
            is_published: gallery.is_published,
            is_active: true,
            published_at: gallery.is_published.then(Utc::now),
        }
    }
}

/// PATCH body for `galleries`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GalleryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_settings: Option<VisibilityRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_settings: Option<SeoRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl GalleryUpdate {
    /// Map a patch; a new title also yields a new slug, publishing stamps `published_at`.
    pub fn new(patch: &GalleryPatch, slug: Option<String>) -> Self {
        Self {
            title: patch.title.clone(),
            slug,
            description: patch.description.clone(),
            cover_image_url: patch.cover_image_url.clone(),
            project_context: patch.project_context.clone(),
            is_published: patch.is_published,
            is_active: patch.is_active,
            visibility_settings: patch.visibility.as_ref().map(Into::into),
            seo_settings: patch.seo.as_ref().map(Into::into),
            published_at: (patch.is_published == Some(true)).then(Utc::now),
            updated_at: Utc::now(),
        }
    }
}

/// A `photos` row as returned by the REST interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRow {
    pub id: Uuid,
    pub gallery_id: Uuid,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub field_journal: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub downloads: i64,
    #[serde(default)]
    pub exif_data: Option<serde_json::Value>,
    #[serde(default)]
    pub gps_data: Option<GpsData>,
    #[serde(default)]
    pub ai_suggestions: Option<SuggestionBundle>,
    pub date_taken: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn counter(value: i64) -> u64 {
    value.max(0) as u64
}

impl From<PhotoRow> for Photo {
    fn from(row: PhotoRow) -> Self {
        // Rows created by older clients store `{}` for missing EXIF.
        let exif = row
            .exif_data
            .and_then(|v| serde_json::from_value::<ExifData>(v).ok())
            .filter(|e| !e.is_empty());

        Self {
            id: row.id,
            gallery_id: row.gallery_id,
            image_url: row.image_url,
            thumbnail_url: row.thumbnail_url,
            alt_text: row.alt_text,
            caption: row.caption,
            field_journal: row.field_journal,
            location: row.location,
            category: row.category.as_deref().and_then(PhotoCategory::parse),
            tags: row.tags.unwrap_or_default(),
            display_order: row.display_order,
            is_published: row.is_published,
            is_featured: row.is_featured,
            telemetry: Telemetry {
                views: counter(row.views),
                likes: counter(row.likes),
                shares: counter(row.shares),
                downloads: counter(row.downloads),
            },
            exif,
            gps: row.gps_data,
            ai_suggestions: row.ai_suggestions,
            date_taken: row.date_taken,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert body for `photos`.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoInsert {
    pub gallery_id: Uuid,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub field_journal: Option<String>,
    pub location: Option<String>,
    pub category: Option<&'static str>,
    pub tags: Vec<String>,
    pub ai_keywords: Vec<String>,
    pub display_order: i32,
    pub is_published: bool,
    pub exif_data: Option<ExifData>,
    pub gps_data: Option<GpsData>,
    pub ai_suggestions: Option<SuggestionBundle>,
    pub ai_processed: bool,
    pub ai_model: Option<String>,
    pub date_taken: Option<NaiveDateTime>,
}

impl From<&NewPhoto> for PhotoInsert {
    fn from(p: &NewPhoto) -> Self {
        Self {
            gallery_id: p.gallery_id,
            image_url: p.image_url.clone(),
            thumbnail_url: p.thumbnail_url.clone(),
            alt_text: p.alt_text.clone(),
            caption: p.caption.clone(),
            field_journal: p.field_journal.clone(),
            location: p.location.clone(),
            category: p.category.map(|c| c.as_str()),
            tags: p.tags.clone(),
            ai_keywords: keyword_values(p.ai_suggestions.as_ref()),
            display_order: p.display_order,
            is_published: p.is_published,
            exif_data: p.exif.clone(),
            gps_data: p.gps.clone(),
            ai_suggestions: p.ai_suggestions.clone(),
            ai_processed: p.ai_suggestions.as_ref().is_some_and(|b| !b.is_empty()),
            ai_model: p.ai_suggestions.as_ref().map(|b| b.model.clone()),
            date_taken: p.date_taken,
        }
    }
}

fn keyword_values(bundle: Option<&SuggestionBundle>) -> Vec<String> {
    bundle
        .map(|b| b.keywords.iter().map(|k| k.value.clone()).collect())
        .unwrap_or_default()
}

/// PATCH body for `photos`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhotoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<SuggestionBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl PhotoUpdate {
    pub fn display_order(order: i32) -> Self {
        Self {
            display_order: Some(order),
            ..Self::touch()
        }
    }

    pub fn published(is_published: bool) -> Self {
        Self {
            is_published: Some(is_published),
            ..Self::touch()
        }
    }

    pub fn featured(is_featured: bool) -> Self {
        Self {
            is_featured: Some(is_featured),
            ..Self::touch()
        }
    }

    pub fn telemetry(t: Telemetry) -> Self {
        let clamp = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
        Self {
            views: Some(clamp(t.views)),
            likes: Some(clamp(t.likes)),
            shares: Some(clamp(t.shares)),
            downloads: Some(clamp(t.downloads)),
            ..Self::touch()
        }
    }

    fn touch() -> Self {
        Self {
            updated_at: Utc::now(),
            ..Self::default()
        }
    }
}

impl From<&PhotoPatch> for PhotoUpdate {
    fn from(p: &PhotoPatch) -> Self {
        Self {
            alt_text: p.alt_text.clone(),
            caption: p.caption.clone(),
            field_journal: p.field_journal.clone(),
            location: p.location.clone(),
            category: p.category.map(|c| c.as_str()),
            tags: p.tags.clone(),
            ai_keywords: p
                .ai_suggestions
                .as_ref()
                .map(|b| keyword_values(Some(b))),
            display_order: p.display_order,
            is_published: p.is_published,
            is_featured: p.is_featured,
            ai_suggestions: p.ai_suggestions.clone(),
            ..Self::touch()
        }
    }
}
