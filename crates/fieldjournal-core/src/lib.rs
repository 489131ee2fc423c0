//! Field Journal Core - upload and enrichment pipeline for a photo-gallery CMS.
//!
//! A raw photo goes through validation, variant generation, EXIF/GPS
//! extraction and vision-model captioning, and is saved to a gallery. The
//! operator's local photo list is reconciled with the store on every
//! reorder, publish toggle and featured selection.
//!
//! # Architecture
//!
//! ```text
//! file → validate → {original, thumbnail} → storage
//!                 → {EXIF, GPS}           (concurrent)
//!                 → AI proxy → vision model → suggestions
//!                 → derived fields → store → photo board
//! ```
//!
//! Every external service sits behind a trait ([`GalleryStore`],
//! [`ObjectStorage`], [`vision::VisionModel`]) and is injected, so the same
//! pipeline runs against the REST backends or in memory.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fieldjournal_core::{Config, FieldJournal, UploadFile};
//!
//! #[tokio::main]
//! async fn main() -> fieldjournal_core::Result<()> {
//!     let journal = FieldJournal::new(Config::load()?)?;
//!     let target = journal.upload_target(gallery_id).await?;
//!     let file = UploadFile::from_path("./dawn.jpg".as_ref()).await?;
//!     let outcome = journal.uploads().upload_file(&target, file).await?;
//!     println!("Saved {}", outcome.photo.id);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod summary;
pub mod types;
pub mod upload;
pub mod vision;

pub use config::Config;
pub use error::{
    ConfigError, FieldJournalError, ReconcileError, Result, StoreError, UploadError,
    ValidationError, VisionError,
};
pub use output::{OutputFormat, OutputWriter};
pub use reconcile::{Bin, BinMove, FeaturedSelector, GalleryBins, PublishReconciler, Reorderer};
pub use store::{GalleryStore, ObjectStorage};
pub use summary::{GallerySummary, SummaryGenerator, SummaryStyle};
pub use types::{
    Gallery, GalleryContext, NewGallery, NewPhoto, Photo, PhotoOrder, PhotoPatch, SuggestionBundle,
    SuggestionField,
};
pub use upload::{
    PhotoBoard, UploadFile, UploadOrchestrator, UploadOutcome, UploadProgress, UploadServices,
    UploadStage, UploadTarget,
};
pub use vision::VisionClient;

use std::sync::Arc;
use uuid::Uuid;

use api::{BatchPublishRequest, ReorderRequest, TelemetryPatch};
use pipeline::{MetadataExtractor, VariantGenerator};
use reconcile::ReorderOutcome;
use store::{MemoryObjectStorage, MemoryStore, RestObjectStorage, RestStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wired services for one configuration.
///
/// Cheap to share behind an `Arc`; every service inside is already
/// reference-counted.
pub struct FieldJournal {
    config: Config,
    store: Arc<dyn GalleryStore>,
    storage: Arc<dyn ObjectStorage>,
    vision: Option<VisionClient>,
    uploads: UploadOrchestrator,
    reorderer: Reorderer,
    publisher: PublishReconciler,
    featured: FeaturedSelector,
    summaries: SummaryGenerator,
}

impl FieldJournal {
    /// Connect to the configured REST store and object storage.
    ///
    /// A missing vision API key is not an error: uploads then skip AI
    /// analysis.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(RestStore::from_config(&config.store)?);
        let storage = Arc::new(RestObjectStorage::from_config(&config.store)?);
        let vision = vision_from_config(&config)?;
        Ok(Self::with_services(config, store, storage, vision))
    }

    /// Services backed by in-memory storage, for dry runs.
    pub fn in_memory(config: Config) -> Result<Self> {
        let vision = vision_from_config(&config)?;
        Ok(Self::with_services(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryObjectStorage::new()),
            vision,
        ))
    }

    pub fn with_services(
        config: Config,
        store: Arc<dyn GalleryStore>,
        storage: Arc<dyn ObjectStorage>,
        vision: Option<VisionClient>,
    ) -> Self {
        tracing::debug!(
            "Initializing Field Journal v{} (vision: {})",
            VERSION,
            vision.as_ref().map_or("disabled", |v| v.model_name())
        );
        let services = UploadServices {
            store: Arc::clone(&store),
            storage: Arc::clone(&storage),
            vision: vision.clone(),
            variants: VariantGenerator::new(config.variants.clone()),
            metadata: MetadataExtractor::new(),
        };
        Self {
            uploads: UploadOrchestrator::new(services, config.upload.clone()),
            reorderer: Reorderer::new(Arc::clone(&store)),
            publisher: PublishReconciler::new(Arc::clone(&store)),
            featured: FeaturedSelector::new(Arc::clone(&store)),
            summaries: SummaryGenerator::new(vision.clone()),
            config,
            store,
            storage,
            vision,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GalleryStore> {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn vision(&self) -> Option<&VisionClient> {
        self.vision.as_ref()
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    pub fn reorderer(&self) -> &Reorderer {
        &self.reorderer
    }

    pub fn publisher(&self) -> &PublishReconciler {
        &self.publisher
    }

    pub fn featured(&self) -> &FeaturedSelector {
        &self.featured
    }

    pub fn summaries(&self) -> &SummaryGenerator {
        &self.summaries
    }

    /// Photo board holding the gallery's stored photos.
    pub async fn board(&self, gallery_id: Uuid) -> Result<Arc<PhotoBoard>> {
        Ok(Arc::new(PhotoBoard::load(self.store.as_ref(), gallery_id).await?))
    }

    /// Upload target for a gallery, with a freshly loaded board.
    pub async fn upload_target(&self, gallery_id: Uuid) -> Result<UploadTarget> {
        let gallery = self.store.get_gallery(gallery_id).await?;
        let board = self.board(gallery_id).await?;
        Ok(UploadTarget::new(&gallery, board))
    }

    /// Apply a validated reorder request to a board.
    pub async fn reorder(&self, board: &PhotoBoard, request: &ReorderRequest) -> Result<ReorderOutcome> {
        let orders = request.validate().map_err(ReconcileError::from)?;
        Ok(self.reorderer.apply_orders(board, &orders).await?)
    }

    /// Apply a validated batch publish request to a board.
    pub async fn batch_publish(&self, board: &PhotoBoard, request: &BatchPublishRequest) -> Result<usize> {
        let ids = request.validate()?;
        Ok(self
            .publisher
            .publish_photos(board, &ids, request.is_published)
            .await?)
    }

    /// Approve suggestion fields and keywords, then persist the approved values.
    pub async fn approve_suggestions(
        &self,
        photo_id: Uuid,
        fields: &[SuggestionField],
        keywords: &[usize],
    ) -> Result<Photo> {
        let photo = self.store.get_photo(photo_id).await?;
        let mut bundle = photo
            .ai_suggestions
            .ok_or_else(|| ValidationError::new("aiSuggestions", "photo has no AI suggestions"))?;
        for &field in fields {
            bundle.approve(field);
        }
        for &index in keywords {
            if !bundle.approve_keyword(index) {
                return Err(ValidationError::new(
                    format!("keywords[{index}]"),
                    format!("only {} keywords suggested", bundle.keywords.len()),
                )
                .into());
            }
        }
        let patch = bundle.approved_patch();
        Ok(self.store.update_photo(photo_id, &patch).await?)
    }

    /// Merge a telemetry patch; counters never decrease.
    pub async fn patch_telemetry(&self, photo_id: Uuid, patch: &TelemetryPatch) -> Result<Photo> {
        patch.validate()?;
        let photo = self.store.get_photo(photo_id).await?;
        let merged = patch.apply(photo.telemetry);
        Ok(self.store.update_telemetry(photo_id, merged).await?)
    }

    pub async fn record_view(&self, photo_id: Uuid) -> Result<()> {
        Ok(self.store.increment_views(photo_id).await?)
    }

    /// Delete a photo row and its stored objects.
    pub async fn delete_photo(&self, photo_id: Uuid) -> Result<()> {
        Ok(store::delete_photo_with_objects(self.store.as_ref(), self.storage.as_ref(), photo_id).await?)
    }

    /// Introduction for one gallery. Never fails once the photos are loaded.
    pub async fn summarize_gallery(&self, gallery_id: Uuid, style: SummaryStyle) -> Result<GallerySummary> {
        let gallery = self.store.get_gallery(gallery_id).await?;
        let photos = self.store.list_photos(gallery_id, false).await?;
        Ok(self.summaries.summarize(&gallery, &photos, style).await)
    }
}

fn vision_from_config(config: &Config) -> Result<Option<VisionClient>> {
    match VisionClient::from_config(&config.vision) {
        Ok(client) => Ok(Some(client)),
        Err(VisionError::NotConfigured(reason)) => {
            tracing::warn!("AI analysis disabled: {reason}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeywordCategory, KeywordSuggestion, ValueSuggestion};

    fn journal() -> (FieldJournal, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let journal = FieldJournal::with_services(
            Config::default(),
            store.clone(),
            Arc::new(MemoryObjectStorage::new()),
            None,
        );
        (journal, store)
    }

    async fn photo_with_suggestions(store: &MemoryStore) -> Photo {
        let gallery = store
            .create_gallery(&NewGallery {
                title: "Lamu".into(),
                ..NewGallery::default()
            })
            .await
            .unwrap();
        let mut bundle = SuggestionBundle::empty("m");
        bundle.caption = ValueSuggestion::new("Dhows at low tide", 0.85);
        bundle.alt_text = ValueSuggestion::new("Wooden boats on sand", 0.85);
        bundle.keywords = vec![KeywordSuggestion {
            value: "tidal-flat".into(),
            category: KeywordCategory::Topographical,
            confidence: 0.9,
            approved: false,
        }];
        store
            .insert_photo(&NewPhoto {
                gallery_id: gallery.id,
                image_url: "memory://objects/a.jpg".into(),
                display_order: 1,
                ai_suggestions: Some(bundle),
                ..NewPhoto::default()
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_in_memory_without_vision_key() {
        let mut config = Config::default();
        config.vision.api_key = String::new();
        let journal = FieldJournal::in_memory(config).unwrap();
        assert!(journal.vision().is_none());
        assert_eq!(journal.config().upload.max_concurrent, 3);
    }

    #[tokio::test]
    async fn test_approve_persists_only_approved_fields() {
        let (journal, store) = journal();
        let photo = photo_with_suggestions(&store).await;

        let saved = journal
            .approve_suggestions(photo.id, &[SuggestionField::Caption], &[0])
            .await
            .unwrap();
        assert_eq!(saved.caption.as_deref(), Some("Dhows at low tide"));
        assert_eq!(saved.alt_text, None);
        assert_eq!(saved.tags, vec!["tidal-flat".to_string()]);
        assert!(saved.ai_suggestions.unwrap().caption.approved);
    }

    #[tokio::test]
    async fn test_approve_rejects_unknown_keyword() {
        let (journal, store) = journal();
        let photo = photo_with_suggestions(&store).await;

        let err = journal
            .approve_suggestions(photo.id, &[], &[4])
            .await
            .unwrap_err();
        assert!(matches!(err, FieldJournalError::Validation(_)));
    }

    #[tokio::test]
    async fn test_telemetry_never_decreases() {
        let (journal, store) = journal();
        let photo = photo_with_suggestions(&store).await;
        journal.record_view(photo.id).await.unwrap();
        journal.record_view(photo.id).await.unwrap();

        let patch = TelemetryPatch {
            views: Some(1),
            likes: Some(5),
            ..TelemetryPatch::default()
        };
        let saved = journal.patch_telemetry(photo.id, &patch).await.unwrap();
        assert_eq!(saved.telemetry.views, 2);
        assert_eq!(saved.telemetry.likes, 5);
    }

    #[tokio::test]
    async fn test_reorder_request_rejected_before_store() {
        let (journal, store) = journal();
        let photo = photo_with_suggestions(&store).await;
        let board = journal.board(photo.gallery_id).await.unwrap();

        let request = ReorderRequest { orders: vec![] };
        let err = journal.reorder(&board, &request).await.unwrap_err();
        assert!(matches!(err, FieldJournalError::Reconcile(ReconcileError::Validation(_))));
        assert_eq!(store.call_count("reorder_bulk"), 0);
    }
}
