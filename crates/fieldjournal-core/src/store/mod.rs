//! Gallery and photo persistence.
//!
//! [`GalleryStore`] is the typed seam over the database's REST query
//! interface; [`ObjectStorage`] holds the image files. Both are object-safe
//! so services take `Arc<dyn ...>` and tests substitute the in-memory
//! implementations.

pub(crate) mod memory;
pub(crate) mod rest;
pub(crate) mod rows;
pub(crate) mod storage;

pub use memory::{Faults, MemoryObjectStorage, MemoryStore};
pub use rest::RestStore;
pub use storage::{ObjectStorage, RestObjectStorage};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{
    slugify, Gallery, GalleryPatch, NewGallery, NewPhoto, Photo, PhotoOrder, PhotoPatch,
    Telemetry,
};

/// Typed access to galleries and photos.
///
/// Listings never include inactive galleries. Photo listings are ordered by
/// `display_order` ascending.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    // --- Galleries ---

    /// Active galleries, newest first. `published_only` hides drafts.
    async fn list_galleries(&self, published_only: bool) -> StoreResult<Vec<Gallery>>;

    async fn get_gallery(&self, id: Uuid) -> StoreResult<Gallery>;

    /// Active gallery by slug.
    async fn get_gallery_by_slug(&self, slug: &str) -> StoreResult<Gallery>;

    /// Whether any gallery (active or not) already uses `slug`.
    async fn slug_exists(&self, slug: &str) -> StoreResult<bool>;

    /// Insert a gallery under an already-unique slug.
    async fn insert_gallery(&self, gallery: &NewGallery, slug: &str) -> StoreResult<Gallery>;

    async fn update_gallery(&self, id: Uuid, patch: &GalleryPatch) -> StoreResult<Gallery>;

    /// Delete a gallery and, by cascade, its photos.
    async fn delete_gallery(&self, id: Uuid) -> StoreResult<()>;

    // --- Photos ---

    async fn list_photos(&self, gallery_id: Uuid, published_only: bool) -> StoreResult<Vec<Photo>>;

    /// Published featured photos across galleries, newest first.
    async fn list_featured(&self, limit: usize) -> StoreResult<Vec<Photo>>;

    async fn get_photo(&self, id: Uuid) -> StoreResult<Photo>;

    async fn insert_photo(&self, photo: &NewPhoto) -> StoreResult<Photo>;

    async fn update_photo(&self, id: Uuid, patch: &PhotoPatch) -> StoreResult<Photo>;

    async fn delete_photo(&self, id: Uuid) -> StoreResult<()>;

    /// Highest `display_order` in the gallery, 0 when empty.
    async fn max_display_order(&self, gallery_id: Uuid) -> StoreResult<i32>;

    /// Set `is_published` on every listed photo. Returns rows changed.
    async fn batch_publish(&self, ids: &[Uuid], is_published: bool) -> StoreResult<usize>;

    /// Persist a complete ordering in one call.
    async fn reorder_bulk(&self, gallery_id: Uuid, orders: &[PhotoOrder]) -> StoreResult<()>;

    /// Persist one photo's position.
    async fn update_display_order(&self, id: Uuid, display_order: i32) -> StoreResult<()>;

    /// Clear `is_featured` on every photo of the gallery.
    async fn clear_featured(&self, gallery_id: Uuid) -> StoreResult<()>;

    async fn set_featured(&self, id: Uuid, is_featured: bool) -> StoreResult<()>;

    async fn increment_views(&self, id: Uuid) -> StoreResult<()>;

    async fn update_telemetry(&self, id: Uuid, telemetry: Telemetry) -> StoreResult<Photo>;

    // --- Provided ---

    /// Create a gallery with a slug derived from its title, suffixed
    /// `-2`, `-3`, ... until unique.
    async fn create_gallery(&self, gallery: &NewGallery) -> StoreResult<Gallery> {
        let slug = unique_slug(self, &gallery.title).await?;
        self.insert_gallery(gallery, &slug).await
    }

    async fn set_gallery_published(&self, id: Uuid, is_published: bool) -> StoreResult<Gallery> {
        let patch = GalleryPatch {
            is_published: Some(is_published),
            ..GalleryPatch::default()
        };
        self.update_gallery(id, &patch).await
    }
}

const MAX_SLUG_SUFFIX: u32 = 1000;

pub(crate) async fn unique_slug<S: GalleryStore + ?Sized>(store: &S, title: &str) -> StoreResult<String> {
    let base = slugify(title);
    if base.is_empty() {
        return Err(StoreError::InvalidInput(format!(
            "title {title:?} has no characters usable in a slug"
        )));
    }
    if !store.slug_exists(&base).await? {
        return Ok(base);
    }
    for n in 2..=MAX_SLUG_SUFFIX {
        let candidate = format!("{base}-{n}");
        if !store.slug_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(StoreError::InvalidInput(format!("no free slug for {base}")))
}

/// Delete a photo row, removing its stored objects first.
///
/// Object removal is best-effort: a storage failure is logged and the row is
/// still deleted.
pub async fn delete_photo_with_objects(
    store: &dyn GalleryStore,
    storage: &dyn ObjectStorage,
    id: Uuid,
) -> StoreResult<()> {
    let photo = store.get_photo(id).await?;
    let urls = [Some(photo.image_url.as_str()), photo.thumbnail_url.as_deref()];
    for url in urls.into_iter().flatten() {
        let Some(path) = storage.path_from_url(url) else {
            continue;
        };
        if let Err(e) = storage.delete(&path).await {
            tracing::warn!("Could not remove stored object {path}: {e}");
        }
    }
    store.delete_photo(id).await
}
