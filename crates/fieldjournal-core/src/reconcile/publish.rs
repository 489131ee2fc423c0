//! Published/draft transitions for galleries and photos.
//!
//! Each transition is applied locally first, then written to the store. If
//! the write fails the inverse is applied locally, so the board never
//! claims a state the store does not have.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{ReconcileError, StoreResult};
use crate::store::GalleryStore;
use crate::types::Gallery;
use crate::upload::PhotoBoard;

/// The two columns of the gallery overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bin {
    Published,
    Draft,
}

impl Bin {
    pub fn of(is_published: bool) -> Self {
        if is_published {
            Self::Published
        } else {
            Self::Draft
        }
    }

    pub fn is_published(self) -> bool {
        self == Self::Published
    }
}

/// What a bin drop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinMove {
    /// Already in the target bin; nothing written
    Unchanged,
    Moved,
}

/// The operator's gallery list, split into bins by publish state.
#[derive(Debug, Default)]
pub struct GalleryBins {
    galleries: Mutex<Vec<Gallery>>,
}

impl GalleryBins {
    pub fn new(galleries: Vec<Gallery>) -> Self {
        Self {
            galleries: Mutex::new(galleries),
        }
    }

    /// Every active gallery in the store.
    pub async fn load(store: &dyn GalleryStore) -> StoreResult<Self> {
        Ok(Self::new(store.list_galleries(false).await?))
    }

    pub async fn bin(&self, bin: Bin) -> Vec<Gallery> {
        self.galleries
            .lock()
            .await
            .iter()
            .filter(|g| Bin::of(g.is_published) == bin)
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> Vec<Gallery> {
        self.galleries.lock().await.clone()
    }
}

/// Applies publish transitions with compensation on failure.
#[derive(Clone)]
pub struct PublishReconciler {
    store: Arc<dyn GalleryStore>,
}

impl PublishReconciler {
    pub fn new(store: Arc<dyn GalleryStore>) -> Self {
        Self { store }
    }

    /// Drop a gallery card into `target`.
    pub async fn move_gallery(
        &self,
        bins: &GalleryBins,
        gallery_id: Uuid,
        target: Bin,
    ) -> Result<BinMove, ReconcileError> {
        let mut galleries = bins.galleries.lock().await;
        let index = galleries
            .iter()
            .position(|g| g.id == gallery_id)
            .ok_or(ReconcileError::NotLoaded {
                resource: "gallery",
                id: gallery_id,
            })?;

        let previous = galleries[index].is_published;
        if Bin::of(previous) == target {
            return Ok(BinMove::Unchanged);
        }
        galleries[index].is_published = target.is_published();

        match self
            .store
            .set_gallery_published(gallery_id, target.is_published())
            .await
        {
            Ok(saved) => {
                tracing::info!("Gallery {} moved to {target:?}", saved.slug);
                galleries[index] = saved;
                Ok(BinMove::Moved)
            }
            Err(e) => {
                tracing::error!("Failed to move gallery {gallery_id} to {target:?}: {e}");
                galleries[index].is_published = previous;
                Err(ReconcileError::Reverted(e))
            }
        }
    }

    /// Publish or unpublish photos on a board. Returns rows the store changed.
    pub async fn publish_photos(
        &self,
        board: &PhotoBoard,
        ids: &[Uuid],
        is_published: bool,
    ) -> Result<usize, ReconcileError> {
        let mut state = board.lock().await;
        let mut previous = Vec::with_capacity(ids.len());
        for &id in ids {
            let photo = state.photo_mut(id).ok_or(ReconcileError::NotLoaded {
                resource: "photo",
                id,
            })?;
            previous.push((id, photo.is_published));
        }
        for &id in ids {
            if let Some(photo) = state.photo_mut(id) {
                photo.is_published = is_published;
            }
        }

        match self.store.batch_publish(ids, is_published).await {
            Ok(changed) => {
                tracing::debug!(
                    "Set published={is_published} on {changed} of {} photos",
                    ids.len()
                );
                Ok(changed)
            }
            Err(e) => {
                tracing::error!("Batch publish failed, restoring {} photos: {e}", ids.len());
                for (id, was) in previous {
                    if let Some(photo) = state.photo_mut(id) {
                        photo.is_published = was;
                    }
                }
                Err(ReconcileError::Reverted(e))
            }
        }
    }
}
