//! Photo fields derived at save time from GPS and AI suggestions.

use crate::types::{GpsData, KeywordCategory, KeywordSuggestion, PhotoCategory};

/// Keywords at or above this confidence become tags.
pub const TAG_CONFIDENCE: f32 = 0.7;

/// At most this many tags per photo.
pub const MAX_TAGS: usize = 10;

const VOCABULARY: &[(PhotoCategory, &[&str])] = &[
    (
        PhotoCategory::Wildlife,
        &[
            "animal", "wildlife", "lion", "elephant", "bird", "mammal", "fauna", "predator",
            "ungulate", "avifauna",
        ],
    ),
    (
        PhotoCategory::Landscape,
        &[
            "mountain", "savanna", "plain", "horizon", "terrain", "ecosystem", "vegetation",
            "geological",
        ],
    ),
    (
        PhotoCategory::Culture,
        &[
            "tribe", "village", "traditional", "ritualistic", "ethnographic", "communal",
            "ceremonial", "vernacular",
        ],
    ),
    (
        PhotoCategory::Accommodation,
        &["camp", "lodge", "hotel", "tent", "shelter", "dwelling", "habitation"],
    ),
];

/// `"2.3251S, 36.8219E"`: absolute values to four places with hemisphere letters.
pub fn format_location(gps: &GpsData) -> String {
    let lat_dir = if gps.latitude >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if gps.longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.4}{lat_dir}, {:.4}{lon_dir}",
        gps.latitude.abs(),
        gps.longitude.abs()
    )
}

/// Photo category from keyword vocabulary, then from keyword taxonomy.
pub fn infer_category(keywords: &[KeywordSuggestion]) -> Option<PhotoCategory> {
    let values: Vec<String> = keywords.iter().map(|k| k.value.to_lowercase()).collect();

    for (category, words) in VOCABULARY {
        if words.iter().any(|w| values.iter().any(|v| v == w)) {
            return Some(*category);
        }
    }

    keywords.iter().find_map(|k| match k.category {
        KeywordCategory::Topographical | KeywordCategory::Technical => Some(PhotoCategory::Landscape),
        KeywordCategory::Observational => Some(PhotoCategory::Culture),
        _ => None,
    })
}

/// Confident keyword values, in suggestion order.
pub fn extract_tags(keywords: &[KeywordSuggestion]) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| k.confidence >= TAG_CONFIDENCE)
        .map(|k| k.value.clone())
        .take(MAX_TAGS)
        .collect()
}
