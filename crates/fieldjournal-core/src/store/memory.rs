//! In-process store and object storage.
//!
//! Used for `--dry-run` uploads and as the substitute store in tests. Faults
//! can be injected per operation class to exercise fallback paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::storage::ObjectStorage;
use super::GalleryStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    slugify, Gallery, GalleryPatch, NewGallery, NewPhoto, Photo, PhotoOrder, PhotoPatch,
    Telemetry,
};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Fail every `reorder_bulk` call
    pub reorder_bulk: bool,
    /// Allow this many `update_display_order` calls, then fail the rest
    pub row_updates_allowed: Option<usize>,
    /// Fail `insert_photo`
    pub insert_photo: bool,
    /// Fail publish and featured writes
    pub flag_writes: bool,
}

#[derive(Default)]
struct State {
    galleries: Vec<Gallery>,
    photos: Vec<Photo>,
    faults: Faults,
    row_updates: usize,
    calls: Vec<&'static str>,
    bulk_orders: Vec<Vec<PhotoOrder>>,
}

fn injected(op: &str) -> StoreError {
    StoreError::Http {
        status: 503,
        message: format!("injected failure: {op}"),
    }
}

fn photo_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound {
        resource: "photo",
        key: id.to_string(),
    }
}

fn gallery_not_found(key: impl ToString) -> StoreError {
    StoreError::NotFound {
        resource: "gallery",
        key: key.to_string(),
    }
}

/// Gallery store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: Faults) {
        if let Ok(mut state) = self.state.lock() {
            state.faults = faults;
            state.row_updates = 0;
        }
    }

    /// Number of calls made to `op` (the trait method name).
    pub fn call_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.iter().filter(|c| **c == op).count())
            .unwrap_or(0)
    }

    /// Payloads of every `reorder_bulk` call, in order.
    pub fn bulk_orders(&self) -> Vec<Vec<PhotoOrder>> {
        self.state
            .lock()
            .map(|s| s.bulk_orders.clone())
            .unwrap_or_default()
    }

    fn with_state<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut State) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Network("memory store lock poisoned".to_string()))?;
        state.calls.push(op);
        f(&mut state)
    }
}

impl State {
    fn photo_mut(&mut self, id: Uuid) -> StoreResult<&mut Photo> {
        self.photos
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| photo_not_found(id))
    }

    fn gallery_mut(&mut self, id: Uuid) -> StoreResult<&mut Gallery> {
        self.galleries
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| gallery_not_found(id))
    }
}

#[async_trait]
impl GalleryStore for MemoryStore {
    async fn list_galleries(&self, published_only: bool) -> StoreResult<Vec<Gallery>> {
        self.with_state("list_galleries", |s| {
            let mut galleries: Vec<Gallery> = s
                .galleries
                .iter()
                .filter(|g| g.is_listed() && (!published_only || g.is_published))
                .cloned()
                .collect();
            galleries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(galleries)
        })
    }

    async fn get_gallery(&self, id: Uuid) -> StoreResult<Gallery> {
        self.with_state("get_gallery", |s| s.gallery_mut(id).map(|g| g.clone()))
    }

    async fn get_gallery_by_slug(&self, slug: &str) -> StoreResult<Gallery> {
        self.with_state("get_gallery_by_slug", |s| {
            s.galleries
                .iter()
                .find(|g| g.slug == slug && g.is_listed())
                .cloned()
                .ok_or_else(|| gallery_not_found(slug))
        })
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        self.with_state("slug_exists", |s| {
            Ok(s.galleries.iter().any(|g| g.slug == slug))
        })
    }

    async fn insert_gallery(&self, gallery: &NewGallery, slug: &str) -> StoreResult<Gallery> {
        self.with_state("insert_gallery", |s| {
            if s.galleries.iter().any(|g| g.slug == slug) {
                return Err(StoreError::Http {
                    status: 409,
                    message: format!("duplicate slug {slug}"),
                });
            }
            let now = Utc::now();
            let created = Gallery {
                id: Uuid::new_v4(),
                title: gallery.title.trim().to_string(),
                slug: slug.to_string(),
                description: gallery.description.clone(),
                cover_image_url: gallery.cover_image_url.clone(),
                cover_thumbnail_url: None,
                project_context: gallery.project_context.clone(),
                is_published: gallery.is_published,
                is_active: true,
                visibility: gallery.visibility.clone(),
                seo: gallery.seo.clone(),
                created_at: now,
                updated_at: now,
                published_at: gallery.is_published.then_some(now),
            };
            s.galleries.push(created.clone());
            Ok(created)
        })
    }

    async fn update_gallery(&self, id: Uuid, patch: &GalleryPatch) -> StoreResult<Gallery> {
        self.with_state("update_gallery", |s| {
            if patch.is_published.is_some() && s.faults.flag_writes {
                return Err(injected("update_gallery"));
            }
            let new_slug = patch.title.as_deref().map(slugify);
            if let Some(slug) = &new_slug {
                if s.galleries.iter().any(|g| g.id != id && &g.slug == slug) {
                    return Err(StoreError::Http {
                        status: 409,
                        message: format!("duplicate slug {slug}"),
                    });
                }
            }
            let gallery = s.gallery_mut(id)?;
            if let Some(title) = &patch.title {
                gallery.title = title.trim().to_string();
            }
            if let Some(slug) = new_slug {
                gallery.slug = slug;
            }
            if let Some(v) = &patch.description {
                gallery.description = Some(v.clone());
            }
            if let Some(v) = &patch.cover_image_url {
                gallery.cover_image_url = Some(v.clone());
            }
            if let Some(v) = &patch.project_context {
                gallery.project_context = Some(v.clone());
            }
            if let Some(v) = patch.is_published {
                gallery.is_published = v;
                if v {
                    gallery.published_at = Some(Utc::now());
                }
            }
            if let Some(v) = patch.is_active {
                gallery.is_active = v;
            }
            if let Some(v) = &patch.visibility {
                gallery.visibility = v.clone();
            }
            if let Some(v) = &patch.seo {
                gallery.seo = v.clone();
            }
            gallery.updated_at = Utc::now();
            Ok(gallery.clone())
        })
    }

    async fn delete_gallery(&self, id: Uuid) -> StoreResult<()> {
        self.with_state("delete_gallery", |s| {
            let before = s.galleries.len();
            s.galleries.retain(|g| g.id != id);
            if s.galleries.len() == before {
                return Err(gallery_not_found(id));
            }
            s.photos.retain(|p| p.gallery_id != id);
            Ok(())
        })
    }

    async fn list_photos(&self, gallery_id: Uuid, published_only: bool) -> StoreResult<Vec<Photo>> {
        self.with_state("list_photos", |s| {
            let mut photos: Vec<Photo> = s
                .photos
                .iter()
                .filter(|p| p.gallery_id == gallery_id && (!published_only || p.is_published))
                .cloned()
                .collect();
            photos.sort_by(|a, b| {
                a.display_order
                    .cmp(&b.display_order)
                    .then(a.created_at.cmp(&b.created_at))
            });
            Ok(photos)
        })
    }

    async fn list_featured(&self, limit: usize) -> StoreResult<Vec<Photo>> {
        self.with_state("list_featured", |s| {
            let mut photos: Vec<Photo> = s
                .photos
                .iter()
                .filter(|p| p.is_featured && p.is_published)
                .filter(|p| s.galleries.iter().any(|g| g.id == p.gallery_id && g.is_active))
                .cloned()
                .collect();
            photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            photos.truncate(limit);
            Ok(photos)
        })
    }

    async fn get_photo(&self, id: Uuid) -> StoreResult<Photo> {
        self.with_state("get_photo", |s| s.photo_mut(id).map(|p| p.clone()))
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> StoreResult<Photo> {
        self.with_state("insert_photo", |s| {
            if s.faults.insert_photo {
                return Err(injected("insert_photo"));
            }
            let now = Utc::now();
            let created = Photo {
                id: Uuid::new_v4(),
                gallery_id: photo.gallery_id,
                image_url: photo.image_url.clone(),
                thumbnail_url: photo.thumbnail_url.clone(),
                alt_text: photo.alt_text.clone(),
                caption: photo.caption.clone(),
                field_journal: photo.field_journal.clone(),
                location: photo.location.clone(),
                category: photo.category,
                tags: photo.tags.clone(),
                display_order: photo.display_order,
                is_published: photo.is_published,
                is_featured: false,
                telemetry: Telemetry::default(),
                exif: photo.exif.clone(),
                gps: photo.gps.clone(),
                ai_suggestions: photo.ai_suggestions.clone(),
                date_taken: photo.date_taken,
                created_at: now,
                updated_at: now,
            };
            s.photos.push(created.clone());
            Ok(created)
        })
    }

    async fn update_photo(&self, id: Uuid, patch: &PhotoPatch) -> StoreResult<Photo> {
        self.with_state("update_photo", |s| {
            let photo = s.photo_mut(id)?;
            patch.apply_to(photo);
            photo.updated_at = Utc::now();
            Ok(photo.clone())
        })
    }

    async fn delete_photo(&self, id: Uuid) -> StoreResult<()> {
        self.with_state("delete_photo", |s| {
            let before = s.photos.len();
            s.photos.retain(|p| p.id != id);
            if s.photos.len() == before {
                return Err(photo_not_found(id));
            }
            Ok(())
        })
    }

    async fn max_display_order(&self, gallery_id: Uuid) -> StoreResult<i32> {
        self.with_state("max_display_order", |s| {
            Ok(s.photos
                .iter()
                .filter(|p| p.gallery_id == gallery_id)
                .map(|p| p.display_order)
                .max()
                .unwrap_or(0))
        })
    }

    async fn batch_publish(&self, ids: &[Uuid], is_published: bool) -> StoreResult<usize> {
        self.with_state("batch_publish", |s| {
            if s.faults.flag_writes {
                return Err(injected("batch_publish"));
            }
            let mut changed = 0;
            for photo in s.photos.iter_mut().filter(|p| ids.contains(&p.id)) {
                photo.is_published = is_published;
                photo.updated_at = Utc::now();
                changed += 1;
            }
            Ok(changed)
        })
    }

    async fn reorder_bulk(&self, gallery_id: Uuid, orders: &[PhotoOrder]) -> StoreResult<()> {
        self.with_state("reorder_bulk", |s| {
            s.bulk_orders.push(orders.to_vec());
            if s.faults.reorder_bulk {
                return Err(injected("reorder_bulk"));
            }
            let positions: HashMap<Uuid, i32> =
                orders.iter().map(|o| (o.id, o.display_order)).collect();
            for photo in s.photos.iter_mut().filter(|p| p.gallery_id == gallery_id) {
                if let Some(order) = positions.get(&photo.id) {
                    photo.display_order = *order;
                }
            }
            Ok(())
        })
    }

    async fn update_display_order(&self, id: Uuid, display_order: i32) -> StoreResult<()> {
        self.with_state("update_display_order", |s| {
            if let Some(allowed) = s.faults.row_updates_allowed {
                if s.row_updates >= allowed {
                    return Err(injected("update_display_order"));
                }
            }
            s.row_updates += 1;
            s.photo_mut(id)?.display_order = display_order;
            Ok(())
        })
    }

    async fn clear_featured(&self, gallery_id: Uuid) -> StoreResult<()> {
        self.with_state("clear_featured", |s| {
            if s.faults.flag_writes {
                return Err(injected("clear_featured"));
            }
            for photo in s
                .photos
                .iter_mut()
                .filter(|p| p.gallery_id == gallery_id && p.is_featured)
            {
                photo.is_featured = false;
            }
            Ok(())
        })
    }

    async fn set_featured(&self, id: Uuid, is_featured: bool) -> StoreResult<()> {
        self.with_state("set_featured", |s| {
            if s.faults.flag_writes {
                return Err(injected("set_featured"));
            }
            s.photo_mut(id)?.is_featured = is_featured;
            Ok(())
        })
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<()> {
        self.with_state("increment_views", |s| {
            s.photo_mut(id)?.telemetry.views += 1;
            Ok(())
        })
    }

    async fn update_telemetry(&self, id: Uuid, telemetry: Telemetry) -> StoreResult<Photo> {
        self.with_state("update_telemetry", |s| {
            let photo = s.photo_mut(id)?;
            photo.telemetry = telemetry;
            Ok(photo.clone())
        })
    }
}

/// Object storage held in memory under `memory://` URLs.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_prefix: Mutex<Option<String>>,
}

const MEMORY_URL_PREFIX: &str = "memory://objects/";

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail uploads whose path starts with `prefix`.
    pub fn fail_uploads_under(&self, prefix: &str) {
        if let Ok(mut fail) = self.fail_prefix.lock() {
            *fail = Some(prefix.to_string());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .map(|o| o.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, path: &str, data: Vec<u8>, _content_type: &str) -> StoreResult<String> {
        let failing = self
            .fail_prefix
            .lock()
            .map(|p| p.as_deref().is_some_and(|prefix| path.starts_with(prefix)))
            .unwrap_or(false);
        if failing {
            return Err(injected("upload"));
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Network("memory storage lock poisoned".to_string()))?;
        objects.insert(path.to_string(), data);
        Ok(self.public_url(path))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Network("memory storage lock poisoned".to_string()))?;
        objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                resource: "object",
                key: path.to_string(),
            })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{MEMORY_URL_PREFIX}{path}")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Gallery with `n` photos ordered `1..=n`; odd positions are published.
    pub(crate) async fn gallery_with_photos(store: &MemoryStore, n: i32) -> (Gallery, Vec<Photo>) {
        let gallery = store
            .create_gallery(&NewGallery {
                title: "Lamu".into(),
                ..NewGallery::default()
            })
            .await
            .unwrap();
        let mut photos = Vec::new();
        for i in 1..=n {
            let photo = store
                .insert_photo(&NewPhoto {
                    gallery_id: gallery.id,
                    image_url: format!("memory://objects/{i}.jpg"),
                    display_order: i,
                    is_published: i % 2 == 1,
                    ..NewPhoto::default()
                })
                .await
                .unwrap();
            photos.push(photo);
        }
        (gallery, photos)
    }

    #[tokio::test]
    async fn test_inactive_gallery_hidden_from_listings() {
        let store = MemoryStore::new();
        let (gallery, photos) = gallery_with_photos(&store, 1).await;
        store.set_gallery_published(gallery.id, true).await.unwrap();
        store.set_featured(photos[0].id, true).await.unwrap();
        assert_eq!(store.list_galleries(true).await.unwrap().len(), 1);
        assert_eq!(store.list_featured(10).await.unwrap().len(), 1);

        let patch = GalleryPatch {
            is_active: Some(false),
            ..GalleryPatch::default()
        };
        store.update_gallery(gallery.id, &patch).await.unwrap();
        assert!(store.list_galleries(false).await.unwrap().is_empty());
        assert!(store.get_gallery_by_slug("lamu").await.is_err());
        assert!(store.list_featured(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_published_only_listing() {
        let store = MemoryStore::new();
        let (gallery, _) = gallery_with_photos(&store, 4).await;
        let published = store.list_photos(gallery.id, true).await.unwrap();
        let orders: Vec<i32> = published.iter().map(|p| p.display_order).collect();
        assert_eq!(orders, [1, 3]);
        assert_eq!(store.max_display_order(gallery.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete_gallery_cascades() {
        let store = MemoryStore::new();
        let (gallery, photos) = gallery_with_photos(&store, 2).await;
        store.delete_gallery(gallery.id).await.unwrap();
        assert!(store.get_photo(photos[0].id).await.is_err());
    }

    #[tokio::test]
    async fn test_row_update_fault_budget() {
        let store = MemoryStore::new();
        let (_, photos) = gallery_with_photos(&store, 3).await;
        store.set_faults(Faults {
            row_updates_allowed: Some(1),
            ..Faults::default()
        });
        assert!(store.update_display_order(photos[0].id, 9).await.is_ok());
        assert!(store.update_display_order(photos[1].id, 9).await.is_err());
        assert_eq!(store.call_count("update_display_order"), 2);
    }

    #[tokio::test]
    async fn test_object_storage_fault_prefix() {
        let storage = MemoryObjectStorage::new();
        storage.fail_uploads_under("ai-proxy/");
        assert!(storage.upload("ai-proxy/a.jpg", vec![1], "image/jpeg").await.is_err());
        let url = storage.upload("photos/a.jpg", vec![1], "image/jpeg").await.unwrap();
        assert_eq!(storage.path_from_url(&url).as_deref(), Some("photos/a.jpg"));
        assert!(storage.contains("photos/a.jpg"));
    }
}
