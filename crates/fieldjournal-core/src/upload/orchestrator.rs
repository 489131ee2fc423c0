//! Upload orchestration: storage, metadata, AI captioning and persistence
//! for each file, under a bounded number of concurrent pipelines.
//!
//! Enrichment never blocks an upload. Metadata and AI failures degrade to
//! empty fields; only validation, storage of the original and the database
//! insert can fail a file.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use super::board::{PendingPhoto, PhotoBoard};
use super::derive::{extract_tags, format_location, infer_category};
use super::status::{ProgressFn, QueueStatus, Tracker, UploadStage};
use crate::config::UploadConfig;
use crate::error::{StoreResult, UploadError, ValidationError};
use crate::pipeline::discovery::mime_for_path;
use crate::pipeline::hash::extension_for_mime;
use crate::pipeline::{Hasher, MetadataExtractor, UploadValidator, Variant, VariantGenerator};
use crate::store::{GalleryStore, ObjectStorage};
use crate::types::{
    ExifData, Gallery, GalleryContext, GpsExtraction, NewPhoto, Photo, SuggestionBundle,
};
use crate::vision::{ImageInput, VisionClient};

/// Services an upload pipeline depends on.
#[derive(Clone)]
pub struct UploadServices {
    pub store: Arc<dyn GalleryStore>,
    pub storage: Arc<dyn ObjectStorage>,
    /// `None` skips AI analysis entirely
    pub vision: Option<VisionClient>,
    pub variants: VariantGenerator,
    pub metadata: MetadataExtractor,
}

/// A file handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    /// Declared MIME type
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read a file, taking its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_for_path(path).unwrap_or("application/octet-stream");
        Ok(Self::new(file_name, mime_type, data))
    }
}

/// Gallery an upload lands in, with the board showing its photos.
#[derive(Clone)]
pub struct UploadTarget {
    pub gallery_id: uuid::Uuid,
    pub context: GalleryContext,
    pub board: Arc<PhotoBoard>,
}

impl UploadTarget {
    pub fn new(gallery: &Gallery, board: Arc<PhotoBoard>) -> Self {
        Self {
            gallery_id: gallery.id,
            context: gallery.context(),
            board,
        }
    }
}

/// A completed upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub upload_id: String,
    pub photo: Photo,
    /// AI analysis was requested but produced nothing
    pub ai_degraded: bool,
    /// Proxy size reduction, when a proxy was made
    pub proxy_reduction_percent: Option<i32>,
}

struct Inner {
    services: UploadServices,
    config: UploadConfig,
    validator: UploadValidator,
    slots: Arc<Semaphore>,
    tracker: Tracker,
}

/// Runs upload pipelines with bounded concurrency.
#[derive(Clone)]
pub struct UploadOrchestrator {
    inner: Arc<Inner>,
}

impl UploadOrchestrator {
    pub fn new(services: UploadServices, config: UploadConfig) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner: Arc::new(Inner {
                validator: UploadValidator::new(config.clone()),
                services,
                config,
                slots,
                tracker: Tracker::default(),
            }),
        }
    }

    /// Receive every progress event from now on.
    pub fn on_progress(&self, listener: ProgressFn) {
        self.inner.tracker.set_listener(Some(listener));
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.inner.tracker.status()
    }

    /// Cancel uploads still waiting for a slot. Returns how many were cancelled.
    ///
    /// Pipelines already running are not interrupted.
    pub fn cancel_pending(&self) -> usize {
        let pending = self.inner.tracker.pending_ids();
        for id in &pending {
            self.inner.tracker.fail(id, "Cancelled by user".to_string());
        }
        if !pending.is_empty() {
            tracing::info!("Cancelled {} queued uploads", pending.len());
        }
        pending.len()
    }

    /// Drop finished uploads from the queue totals. Returns how many.
    ///
    /// The tracker otherwise remembers every upload for the orchestrator's
    /// lifetime; long-lived callers clear it once results are reported.
    pub fn clear_finished(&self) -> usize {
        self.inner.tracker.prune_finished()
    }

    /// Upload one file and wait for it.
    pub async fn upload_file(
        &self,
        target: &UploadTarget,
        file: UploadFile,
    ) -> Result<UploadOutcome, UploadError> {
        let upload_id = self.inner.tracker.register(&file.file_name);
        self.inner.run(upload_id, target, file).await
    }

    /// Upload files concurrently, at most `max_concurrent` at a time.
    ///
    /// Each file runs in its own task, so a pipeline finishes even if the
    /// caller stops waiting. Results are in input order.
    pub async fn upload_batch(
        &self,
        target: &UploadTarget,
        files: Vec<UploadFile>,
    ) -> Vec<Result<UploadOutcome, UploadError>> {
        let mut names = Vec::with_capacity(files.len());
        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let upload_id = self.inner.tracker.register(&file.file_name);
            names.push(file.file_name.clone());
            let inner = Arc::clone(&self.inner);
            let target = target.clone();
            handles.push(tokio::spawn(async move { inner.run(upload_id, &target, file).await }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, file_name)| match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Upload task for {file_name} panicked: {e}");
                    Err(UploadError::Task {
                        file_name,
                        message: e.to_string(),
                    })
                }
            })
            .collect()
    }
}

impl Inner {
    async fn run(
        &self,
        upload_id: String,
        target: &UploadTarget,
        file: UploadFile,
    ) -> Result<UploadOutcome, UploadError> {
        let result = self.pipeline(&upload_id, target, file).await;
        match &result {
            Ok(outcome) => {
                self.tracker.complete(&upload_id, outcome.photo.id);
                tracing::info!(
                    "Uploaded {} as photo {} (order {})",
                    outcome.photo.image_url,
                    outcome.photo.id,
                    outcome.photo.display_order
                );
            }
            Err(UploadError::Cancelled { file_name }) => {
                tracing::debug!("Skipped cancelled upload {file_name}");
            }
            Err(e) => {
                tracing::error!("{e}");
                self.tracker.fail(&upload_id, format!("Upload failed: {e}"));
            }
        }
        result
    }

    async fn pipeline(
        &self,
        upload_id: &str,
        target: &UploadTarget,
        file: UploadFile,
    ) -> Result<UploadOutcome, UploadError> {
        let UploadFile {
            file_name,
            mime_type,
            data,
        } = file;

        // Rejected before any remote call or slot.
        self.validator
            .validate(&mime_type, &data)
            .map_err(|source| UploadError::Validation {
                file_name: file_name.clone(),
                source,
            })?;

        let _permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|e| task_error(&file_name, e))?;
        if self.tracker.stage(upload_id) == Some(UploadStage::Error) {
            return Err(UploadError::Cancelled { file_name });
        }

        let data = Arc::new(data);
        let services = &self.services;

        // Stage 1: original + thumbnail to storage
        self.tracker.advance(upload_id, UploadStage::Uploading, 0.0);
        let thumbnail = {
            let generator = services.variants.clone();
            let src = Arc::clone(&data);
            tokio::task::spawn_blocking(move || generator.grid_thumbnail(&src))
                .await
                .map_err(|e| task_error(&file_name, e))?
        };

        let original_path = Hasher::object_path(
            &self.config.storage_folder,
            target.gallery_id,
            upload_id,
            &data,
            extension_for_mime(&mime_type),
        );
        let image_url = services
            .storage
            .upload(&original_path, data.to_vec(), &mime_type)
            .await
            .map_err(|source| UploadError::Storage {
                file_name: file_name.clone(),
                source,
            })?;
        let mut stored = vec![original_path];
        self.tracker.advance(upload_id, UploadStage::Uploading, 0.7);

        let thumbnail_mime = thumbnail.mime_type(&mime_type).to_string();
        let thumbnail_path = Hasher::object_path(
            &self.config.thumbnail_folder,
            target.gallery_id,
            upload_id,
            &data,
            extension_for_mime(&thumbnail_mime),
        );
        let thumbnail_url = match services
            .storage
            .upload(&thumbnail_path, thumbnail.data.clone(), &thumbnail_mime)
            .await
        {
            Ok(url) => {
                stored.push(thumbnail_path);
                Some(url)
            }
            Err(e) => {
                tracing::warn!("Thumbnail upload failed for {file_name}: {e}");
                None
            }
        };
        self.tracker.advance(upload_id, UploadStage::Uploading, 1.0);

        target
            .board
            .insert_placeholder(PendingPhoto {
                temp_id: upload_id.to_string(),
                file_name: file_name.clone(),
                preview_url: ImageInput::from_bytes(&thumbnail.data, &thumbnail_mime).data_url(),
            })
            .await;

        // Stage 2: EXIF and GPS, concurrently
        let (exif, gps) = if self.config.extract_metadata {
            self.tracker
                .advance(upload_id, UploadStage::ExtractingMetadata, 0.0);
            let extracted = services.metadata.extract_all(Arc::clone(&data)).await;
            self.tracker
                .advance(upload_id, UploadStage::ExtractingMetadata, 1.0);
            extracted
        } else {
            (ExifData::default(), GpsExtraction::none())
        };

        // Stage 3: AI proxy and analysis
        let mut proxy_reduction_percent = None;
        let mut ai_degraded = false;
        let suggestions = match (&services.vision, self.config.analyze_ai) {
            (Some(vision), true) => {
                self.tracker.advance(upload_id, UploadStage::AnalyzingAi, 0.0);
                let proxy = self.make_proxy(&data, &file_name).await?;
                proxy_reduction_percent = Some(proxy.reduction_percent);
                tracing::debug!(
                    "AI proxy for {file_name}: {} -> {} bytes ({}% reduction)",
                    proxy.original_size,
                    proxy.variant_size,
                    proxy.reduction_percent
                );
                self.tracker.advance(upload_id, UploadStage::AnalyzingAi, 0.3);

                let analysis_url = match self.upload_proxy(upload_id, target, &proxy, &mime_type).await {
                    Ok((url, path)) => {
                        stored.push(path);
                        url
                    }
                    Err(e) => {
                        tracing::warn!("Proxy upload failed for {file_name}, analyzing original: {e}");
                        image_url.clone()
                    }
                };
                let bundle = match vision.analyze_with_retry(&analysis_url, &target.context).await {
                    Ok(bundle) => Some(bundle),
                    Err(e) => {
                        tracing::warn!("AI analysis failed for {file_name}, saving without it: {e}");
                        None
                    }
                };
                ai_degraded = bundle.as_ref().map_or(true, SuggestionBundle::is_empty);
                self.tracker.advance(upload_id, UploadStage::AnalyzingAi, 1.0);
                bundle
            }
            _ => None,
        };

        // Stage 4: database
        self.tracker.advance(upload_id, UploadStage::Saving, 0.0);
        let photo = self
            .save(
                upload_id,
                target,
                SaveInput {
                    file_name: &file_name,
                    image_url,
                    thumbnail_url,
                    exif,
                    gps,
                    suggestions,
                },
                stored,
            )
            .await?;

        Ok(UploadOutcome {
            upload_id: upload_id.to_string(),
            photo,
            ai_degraded,
            proxy_reduction_percent,
        })
    }

    async fn make_proxy(&self, data: &Arc<Vec<u8>>, file_name: &str) -> Result<Variant, UploadError> {
        let generator = self.services.variants.clone();
        let options = generator.proxy_options();
        let src = Arc::clone(data);
        tokio::task::spawn_blocking(move || generator.create_variant(&src, options))
            .await
            .map_err(|e| task_error(file_name, e))
    }

    /// Store the AI proxy. Returns its public URL and object path.
    async fn upload_proxy(
        &self,
        upload_id: &str,
        target: &UploadTarget,
        proxy: &Variant,
        original_mime: &str,
    ) -> StoreResult<(String, String)> {
        let mime = proxy.mime_type(original_mime);
        let path = Hasher::object_path(
            &self.config.proxy_folder,
            target.gallery_id,
            upload_id,
            &proxy.data,
            extension_for_mime(mime),
        );
        let url = self.services.storage.upload(&path, proxy.data.clone(), mime).await?;
        Ok((url, path))
    }

    /// Insert the photo and swap it into the placeholder's slot.
    ///
    /// The board stays locked from choosing the display order until the
    /// placeholder is resolved, so concurrent saves get distinct orders.
    async fn save(
        &self,
        upload_id: &str,
        target: &UploadTarget,
        input: SaveInput<'_>,
        stored: Vec<String>,
    ) -> Result<Photo, UploadError> {
        let store = &self.services.store;
        let mut board = target.board.lock().await;

        let inserted = match store.max_display_order(target.gallery_id).await {
            Ok(stored_max) => {
                let display_order = board.max_order().max(stored_max) + 1;
                let new_photo = input.to_new_photo(target, display_order, self.config.auto_publish);
                store.insert_photo(&new_photo).await
            }
            Err(e) => Err(e),
        };

        match inserted {
            Ok(photo) => {
                board.replace_placeholder(upload_id, photo.clone());
                Ok(photo)
            }
            Err(source) => {
                board.remove_placeholder(upload_id);
                drop(board);
                for path in &stored {
                    if let Err(e) = self.services.storage.delete(path).await {
                        tracing::warn!("Could not remove orphaned object {path}: {e}");
                    }
                }
                Err(UploadError::Save {
                    file_name: input.file_name.to_string(),
                    source,
                })
            }
        }
    }
}

struct SaveInput<'a> {
    file_name: &'a str,
    image_url: String,
    thumbnail_url: Option<String>,
    exif: ExifData,
    gps: GpsExtraction,
    suggestions: Option<SuggestionBundle>,
}

impl SaveInput<'_> {
    fn to_new_photo(&self, target: &UploadTarget, display_order: i32, auto_publish: bool) -> NewPhoto {
        let text = |value: &str| (!value.trim().is_empty()).then(|| value.trim().to_string());
        let bundle = self.suggestions.as_ref();
        let keywords = bundle.map(|b| b.keywords.as_slice()).unwrap_or(&[]);

        NewPhoto {
            gallery_id: target.gallery_id,
            image_url: self.image_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            alt_text: bundle.and_then(|b| text(&b.alt_text.value)),
            caption: bundle.and_then(|b| text(&b.caption.value)),
            field_journal: bundle.and_then(|b| text(&b.story_context.value)),
            location: self.gps.gps.as_ref().map(format_location),
            category: infer_category(keywords),
            tags: extract_tags(keywords),
            display_order,
            is_published: auto_publish,
            exif: (!self.exif.is_empty()).then(|| self.exif.clone()),
            gps: self.gps.gps.clone(),
            ai_suggestions: self.suggestions.clone(),
            date_taken: self.exif.capture_date,
        }
    }
}

fn task_error(file_name: &str, e: impl std::fmt::Display) -> UploadError {
    UploadError::Task {
        file_name: file_name.to_string(),
        message: e.to_string(),
    }
}

/// Field-level validation without running a pipeline.
pub fn validate_upload(config: &UploadConfig, file: &UploadFile) -> Result<(), ValidationError> {
    UploadValidator::new(config.clone()).validate(&file.mime_type, &file.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisionConfig;
    use crate::error::VisionError;
    use crate::store::memory::Faults;
    use crate::store::{MemoryObjectStorage, MemoryStore};
    use crate::vision::{ChatReply, ChatRequest, VisionModel};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    const REPLY: &str = r#"{"keywords":[{"value":"savanna","category":"topographical","confidence":0.9},{"value":"dust","category":"observational","confidence":0.5}],"altText":"Acacia on a dry plain","caption":"Dry season near the river","storyContext":"Herders move cattle at dawn."}"#;

    /// Answers every request after an optional delay, recording image URLs.
    struct FakeModel {
        reply: Result<String, VisionError>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        urls: Mutex<Vec<String>>,
        gate: Option<(Notify, Notify)>,
    }

    impl FakeModel {
        fn new(reply: Result<String, VisionError>) -> Self {
            Self {
                reply,
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl VisionModel for FakeModel {
        fn model(&self) -> &str {
            "fake"
        }

        async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, VisionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            for message in &request.messages {
                if let crate::vision::provider::MessageContent::Parts(parts) = &message.content {
                    for part in parts {
                        if let crate::vision::provider::ContentPart::ImageUrl { image_url } = part {
                            self.urls.lock().unwrap().push(image_url.url.clone());
                        }
                    }
                }
            }
            if let Some((started, release)) = &self.gate {
                started.notify_one();
                release.notified().await;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.reply.clone().map(|text| ChatReply {
                text,
                model: "fake".into(),
                tokens_used: Some(42),
                latency_ms: 1,
            })
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        storage: Arc<MemoryObjectStorage>,
        model: Arc<FakeModel>,
        orchestrator: UploadOrchestrator,
        target: UploadTarget,
    }

    async fn harness(model: FakeModel, config: UploadConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryObjectStorage::new());
        let model = Arc::new(model);
        let vision_config = VisionConfig {
            retry_attempts: 1,
            ..VisionConfig::default()
        };
        let gallery = store
            .create_gallery(&crate::types::NewGallery {
                title: "Omo Valley".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let services = UploadServices {
            store: store.clone(),
            storage: storage.clone(),
            vision: Some(VisionClient::new(model.clone(), vision_config)),
            variants: VariantGenerator::default(),
            metadata: MetadataExtractor::new(),
        };
        let target = UploadTarget::new(&gallery, Arc::new(PhotoBoard::new(gallery.id)));
        Harness {
            store,
            storage,
            model,
            orchestrator: UploadOrchestrator::new(services, config),
            target,
        }
    }

    fn jpeg(width: u32, height: u32) -> UploadFile {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 90]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Jpeg)
            .unwrap();
        UploadFile::new(format!("{width}x{height}.jpg"), "image/jpeg", buf.into_inner())
    }

    #[tokio::test]
    async fn test_upload_saves_enriched_photo() {
        let h = harness(FakeModel::new(Ok(REPLY.into())), UploadConfig::default()).await;
        let outcome = h
            .orchestrator
            .upload_file(&h.target, jpeg(64, 48))
            .await
            .unwrap();

        let photo = &outcome.photo;
        assert!(!outcome.ai_degraded);
        assert_eq!(photo.display_order, 1);
        assert!(photo.is_published);
        assert_eq!(photo.alt_text.as_deref(), Some("Acacia on a dry plain"));
        assert_eq!(photo.field_journal.as_deref(), Some("Herders move cattle at dawn."));
        assert_eq!(photo.category, Some(crate::types::PhotoCategory::Landscape));
        assert_eq!(photo.tags, vec!["savanna".to_string()]);
        assert!(photo.thumbnail_url.is_some());

        // original, thumbnail and proxy
        assert_eq!(h.storage.len(), 3);
        let board = h.target.board.snapshot().await;
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].photo().map(|p| p.id), Some(photo.id));
        assert_eq!(h.orchestrator.queue_status().completed, 1);
    }

    #[tokio::test]
    async fn test_ai_failure_keeps_photo() {
        let failing = FakeModel::new(Err(VisionError::Http {
            status: 500,
            message: "boom".into(),
        }));
        let h = harness(failing, UploadConfig::default()).await;
        let outcome = h
            .orchestrator
            .upload_file(&h.target, jpeg(32, 32))
            .await
            .unwrap();

        assert!(outcome.ai_degraded);
        assert_eq!(outcome.photo.caption, None);
        assert!(outcome.photo.tags.is_empty());
        assert_eq!(h.store.list_photos(h.target.gallery_id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_cleans_up() {
        let h = harness(FakeModel::new(Ok(REPLY.into())), UploadConfig::default()).await;
        h.store.set_faults(Faults {
            insert_photo: true,
            ..Faults::default()
        });

        let err = h
            .orchestrator
            .upload_file(&h.target, jpeg(32, 32))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Save { .. }));
        assert!(err.to_string().starts_with("Failed to save"));
        assert!(h.target.board.snapshot().await.is_empty());
        assert!(h.storage.is_empty());
        assert_eq!(h.orchestrator.queue_status().failed, 1);
    }

    #[tokio::test]
    async fn test_failed_reupload_keeps_earlier_objects() {
        let h = harness(FakeModel::new(Ok(REPLY.into())), UploadConfig::default()).await;
        let first = h
            .orchestrator
            .upload_file(&h.target, jpeg(32, 32))
            .await
            .unwrap()
            .photo;
        assert_eq!(h.storage.len(), 3);

        h.store.set_faults(Faults {
            insert_photo: true,
            ..Faults::default()
        });
        let err = h
            .orchestrator
            .upload_file(&h.target, jpeg(32, 32))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Save { .. }));

        assert_eq!(h.storage.len(), 3);
        let path = h.storage.path_from_url(&first.image_url).unwrap();
        assert!(h.storage.contains(&path));

        assert_eq!(h.orchestrator.clear_finished(), 2);
        assert_eq!(h.orchestrator.queue_status(), QueueStatus::default());
    }

    #[tokio::test]
    async fn test_proxy_failure_analyzes_original() {
        let h = harness(FakeModel::new(Ok(REPLY.into())), UploadConfig::default()).await;
        h.storage.fail_uploads_under("ai-proxy/");

        let outcome = h
            .orchestrator
            .upload_file(&h.target, jpeg(32, 32))
            .await
            .unwrap();
        let urls = h.model.urls.lock().unwrap().clone();
        assert_eq!(urls, vec![outcome.photo.image_url.clone()]);
        assert!(urls[0].starts_with("memory://objects/photos/"));
    }

    #[tokio::test]
    async fn test_invalid_file_makes_no_remote_calls() {
        let h = harness(FakeModel::new(Ok(REPLY.into())), UploadConfig::default()).await;
        let file = UploadFile::new("notes.txt", "text/plain", b"hello".to_vec());

        let err = h.orchestrator.upload_file(&h.target, file).await.unwrap_err();
        assert!(matches!(err, UploadError::Validation { .. }));
        assert!(h.storage.is_empty());
        assert_eq!(h.store.call_count("max_display_order"), 0);
        assert!(h.model.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_respects_concurrency_limit() {
        let mut model = FakeModel::new(Ok(REPLY.into()));
        model.delay = Duration::from_millis(20);
        let config = UploadConfig {
            max_concurrent: 2,
            ..UploadConfig::default()
        };
        let h = harness(model, config).await;

        let files = (0..5).map(|i| jpeg(16 + i, 16)).collect();
        let results = h.orchestrator.upload_batch(&h.target, files).await;

        assert_eq!(results.len(), 5);
        let mut orders: Vec<i32> = results
            .iter()
            .map(|r| r.as_ref().unwrap().photo.display_order)
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert!(h.model.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cancel_pending_skips_queued_files() {
        let mut model = FakeModel::new(Ok(REPLY.into()));
        model.gate = Some((Notify::new(), Notify::new()));
        let config = UploadConfig {
            max_concurrent: 1,
            ..UploadConfig::default()
        };
        let h = harness(model, config).await;

        let orchestrator = h.orchestrator.clone();
        let target = h.target.clone();
        let files = vec![jpeg(20, 20), jpeg(21, 21), jpeg(22, 22)];
        let batch = tokio::spawn(async move { orchestrator.upload_batch(&target, files).await });

        let (started, release) = h.model.gate.as_ref().unwrap();
        started.notified().await;
        assert_eq!(h.orchestrator.cancel_pending(), 2);
        release.notify_one();

        let results = batch.await.unwrap();
        let saved = results.iter().filter(|r| r.is_ok()).count();
        let cancelled = results
            .iter()
            .filter(|r| matches!(r, Err(UploadError::Cancelled { .. })))
            .count();
        assert_eq!((saved, cancelled), (1, 2));
        let status = h.orchestrator.queue_status();
        assert_eq!((status.completed, status.failed), (1, 2));
    }
}
