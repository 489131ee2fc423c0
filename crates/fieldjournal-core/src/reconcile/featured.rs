//! Exclusive featured photo per gallery.
//!
//! The store has no conditional update, so featuring is two writes: clear
//! every flag in the gallery, then set one. Calls for the same gallery are
//! serialised through a keyed lock so two selections cannot interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::error::ReconcileError;
use crate::store::GalleryStore;
use crate::upload::PhotoBoard;

/// Sets the featured photo of a gallery.
#[derive(Clone)]
pub struct FeaturedSelector {
    store: Arc<dyn GalleryStore>,
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl FeaturedSelector {
    pub fn new(store: Arc<dyn GalleryStore>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn gallery_lock(&self, gallery_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        match self.locks.lock() {
            Ok(mut locks) => Arc::clone(locks.entry(gallery_id).or_default()),
            // poisoned map: fall back to an unshared lock
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Make `photo_id` the only featured photo of the board's gallery.
    pub async fn set_featured(&self, board: &PhotoBoard, photo_id: Uuid) -> Result<(), ReconcileError> {
        let gallery_id = board.gallery_id();
        let on_board = board.photos().await.iter().any(|p| p.id == photo_id);
        if !on_board {
            return Err(ReconcileError::NotLoaded {
                resource: "photo",
                id: photo_id,
            });
        }

        let lock = self.gallery_lock(gallery_id);
        let _guard = lock.lock().await;

        self.store.clear_featured(gallery_id).await?;
        let result = self.store.set_featured(photo_id, true).await;

        // after a successful clear the store has no featured photo either way
        let featured = result.is_ok().then_some(photo_id);
        let mut state = board.lock().await;
        let ids: Vec<Uuid> = state.photos().iter().map(|p| p.id).collect();
        for id in ids {
            if let Some(photo) = state.photo_mut(id) {
                photo.is_featured = Some(id) == featured;
            }
        }

        match result {
            Ok(()) => {
                tracing::info!("Photo {photo_id} is now featured in gallery {gallery_id}");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Cleared featured photos but could not feature {photo_id}: {e}");
                Err(ReconcileError::Store(e))
            }
        }
    }

    /// Remove the featured flag from one photo.
    pub async fn unset_featured(&self, board: &PhotoBoard, photo_id: Uuid) -> Result<(), ReconcileError> {
        let lock = self.gallery_lock(board.gallery_id());
        let _guard = lock.lock().await;

        self.store.set_featured(photo_id, false).await?;
        if let Some(photo) = board.lock().await.photo_mut(photo_id) {
            photo.is_featured = false;
        }
        Ok(())
    }
}
