//! The operator's in-memory photo list for one gallery.
//!
//! Uploads add a placeholder as soon as the original is stored and swap it
//! for the saved photo in the same slot. Reorders and publish toggles
//! mutate the same list. All mutation happens under one async lock.

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::store::GalleryStore;
use crate::types::Photo;

/// A photo stored but not yet saved to the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPhoto {
    pub temp_id: String,
    pub file_name: String,
    /// Local preview (thumbnail data URL)
    pub preview_url: String,
}

/// One slot of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoardEntry {
    Pending(PendingPhoto),
    Saved(Photo),
}

impl BoardEntry {
    pub fn photo(&self) -> Option<&Photo> {
        match self {
            Self::Saved(photo) => Some(photo),
            Self::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Board contents, reachable only through [`PhotoBoard::lock`].
#[derive(Debug, Default)]
pub struct BoardState {
    entries: Vec<BoardEntry>,
}

impl BoardState {
    pub fn entries(&self) -> &[BoardEntry] {
        &self.entries
    }

    /// Saved photos in slot order.
    pub fn photos(&self) -> Vec<&Photo> {
        self.entries.iter().filter_map(BoardEntry::photo).collect()
    }

    pub fn photo_mut(&mut self, id: Uuid) -> Option<&mut Photo> {
        self.entries.iter_mut().find_map(|e| match e {
            BoardEntry::Saved(photo) if photo.id == id => Some(photo),
            _ => None,
        })
    }

    /// Indices of slots holding saved photos.
    pub(crate) fn saved_slots(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_pending())
            .map(|(i, _)| i)
            .collect()
    }

    /// Overwrite saved slots in order; placeholders keep their slots.
    pub(crate) fn set_saved(&mut self, photos: Vec<Photo>) {
        let slots = self.saved_slots();
        for (slot, photo) in slots.into_iter().zip(photos) {
            self.entries[slot] = BoardEntry::Saved(photo);
        }
    }

    pub fn push_placeholder(&mut self, pending: PendingPhoto) {
        self.entries.push(BoardEntry::Pending(pending));
    }

    /// Swap a placeholder for the saved photo in the same slot.
    pub fn replace_placeholder(&mut self, temp_id: &str, photo: Photo) -> bool {
        match self.placeholder_index(temp_id) {
            Some(index) => {
                self.entries[index] = BoardEntry::Saved(photo);
                true
            }
            None => false,
        }
    }

    pub fn remove_placeholder(&mut self, temp_id: &str) -> bool {
        match self.placeholder_index(temp_id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Highest display order among saved photos, 0 when none.
    pub fn max_order(&self) -> i32 {
        self.photos()
            .iter()
            .map(|p| p.display_order)
            .max()
            .unwrap_or(0)
    }

    fn placeholder_index(&self, temp_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, BoardEntry::Pending(p) if p.temp_id == temp_id))
    }
}

/// Photo list for one gallery, shared by uploads and reconcilers.
#[derive(Debug)]
pub struct PhotoBoard {
    gallery_id: Uuid,
    state: Mutex<BoardState>,
}

impl PhotoBoard {
    pub fn new(gallery_id: Uuid) -> Self {
        Self::with_photos(gallery_id, Vec::new())
    }

    /// Board seeded with photos, assumed to be in display order.
    pub fn with_photos(gallery_id: Uuid, photos: Vec<Photo>) -> Self {
        Self {
            gallery_id,
            state: Mutex::new(BoardState {
                entries: photos.into_iter().map(BoardEntry::Saved).collect(),
            }),
        }
    }

    /// Board holding the gallery's stored photos.
    pub async fn load(store: &dyn GalleryStore, gallery_id: Uuid) -> StoreResult<Self> {
        let photos = store.list_photos(gallery_id, false).await?;
        Ok(Self::with_photos(gallery_id, photos))
    }

    pub fn gallery_id(&self) -> Uuid {
        self.gallery_id
    }

    pub async fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().await
    }

    pub async fn snapshot(&self) -> Vec<BoardEntry> {
        self.lock().await.entries.clone()
    }

    /// Saved photos in slot order.
    pub async fn photos(&self) -> Vec<Photo> {
        self.lock().await.photos().into_iter().cloned().collect()
    }

    pub async fn insert_placeholder(&self, pending: PendingPhoto) {
        self.lock().await.push_placeholder(pending);
    }

    pub async fn replace_placeholder(&self, temp_id: &str, photo: Photo) -> bool {
        self.lock().await.replace_placeholder(temp_id, photo)
    }

    pub async fn remove_placeholder(&self, temp_id: &str) -> bool {
        self.lock().await.remove_placeholder(temp_id)
    }
}
