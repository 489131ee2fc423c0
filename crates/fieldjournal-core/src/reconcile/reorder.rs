//! Drag-and-drop reordering of a gallery's photos.
//!
//! Every reorder renumbers the whole gallery `1..=N` in board order, shows
//! the result immediately and then persists the complete mapping. A bulk
//! call is tried first; if it fails each photo is written on its own.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ReconcileError;
use crate::store::GalleryStore;
use crate::types::{Photo, PhotoOrder};
use crate::upload::PhotoBoard;

/// How a reorder reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Persistence {
    /// Orders already matched; nothing was written
    Unchanged,
    /// One bulk call
    Bulk,
    /// Per-row fallback, every row written
    RowByRow,
    /// Per-row fallback stopped partway; store and board disagree
    Partial { persisted: usize, failed: usize },
}

/// Result of a reorder that reached the store at least partly.
#[derive(Debug, Clone, Serialize)]
pub struct ReorderOutcome {
    pub orders: Vec<PhotoOrder>,
    pub persistence: Persistence,
}

impl ReorderOutcome {
    pub fn is_partial(&self) -> bool {
        matches!(self.persistence, Persistence::Partial { .. })
    }
}

/// Move the element at `from` so it ends up at index `to`.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

/// Set `display_order` to each photo's 1-based position.
pub fn renumber(photos: &mut [Photo]) -> Vec<PhotoOrder> {
    photos
        .iter_mut()
        .zip(1..)
        .map(|(photo, position)| {
            photo.display_order = position;
            PhotoOrder {
                id: photo.id,
                display_order: position,
            }
        })
        .collect()
}

/// Applies reorders to a board and persists them.
#[derive(Clone)]
pub struct Reorderer {
    store: Arc<dyn GalleryStore>,
}

impl Reorderer {
    pub fn new(store: Arc<dyn GalleryStore>) -> Self {
        Self { store }
    }

    /// Drop the saved photo at position `from` onto position `to`.
    ///
    /// Positions count saved photos only; upload placeholders keep their
    /// slots on the board.
    pub async fn move_photo(
        &self,
        board: &PhotoBoard,
        from: usize,
        to: usize,
    ) -> Result<ReorderOutcome, ReconcileError> {
        let mut state = board.lock().await;
        let previous: Vec<Photo> = state.photos().into_iter().cloned().collect();
        let len = previous.len();
        for index in [from, to] {
            if index >= len {
                return Err(ReconcileError::OutOfRange { index, len });
            }
        }

        let mut photos = previous.clone();
        move_item(&mut photos, from, to);
        tracing::debug!("Moving photo {} from {from} to {to}", photos[to].id);
        let orders = renumber(&mut photos);

        state.set_saved(photos);
        let result = self.persist(board.gallery_id(), &previous, &orders).await;
        if result.is_err() {
            state.set_saved(previous);
        }
        result
    }

    /// Apply a complete ordering, e.g. from a reorder request.
    ///
    /// Listed photos are sorted by their requested order; photos not listed
    /// follow in their current order. The result is renumbered `1..=N`, so
    /// applying the same request twice gives the same sequence.
    pub async fn apply_orders(
        &self,
        board: &PhotoBoard,
        requested: &[PhotoOrder],
    ) -> Result<ReorderOutcome, ReconcileError> {
        let mut state = board.lock().await;
        let previous: Vec<Photo> = state.photos().into_iter().cloned().collect();

        if let Some(missing) = requested
            .iter()
            .find(|o| !previous.iter().any(|p| p.id == o.id))
        {
            return Err(ReconcileError::NotLoaded {
                resource: "photo",
                id: missing.id,
            });
        }

        let rank = |photo: &Photo| {
            requested
                .iter()
                .find(|o| o.id == photo.id)
                .map_or((1, 0), |o| (0, o.display_order))
        };
        let mut photos = previous.clone();
        // stable, so ties and unlisted photos keep their current order
        photos.sort_by_key(rank);
        let orders = renumber(&mut photos);

        state.set_saved(photos);
        let result = self.persist(board.gallery_id(), &previous, &orders).await;
        if result.is_err() {
            state.set_saved(previous);
        }
        result
    }

    async fn persist(
        &self,
        gallery_id: uuid::Uuid,
        previous: &[Photo],
        orders: &[PhotoOrder],
    ) -> Result<ReorderOutcome, ReconcileError> {
        let unchanged = previous.len() == orders.len()
            && previous
                .iter()
                .zip(orders)
                .all(|(p, o)| p.id == o.id && p.display_order == o.display_order);
        if unchanged {
            return Ok(ReorderOutcome {
                orders: orders.to_vec(),
                persistence: Persistence::Unchanged,
            });
        }

        let bulk_err = match self.store.reorder_bulk(gallery_id, orders).await {
            Ok(()) => {
                tracing::debug!("Persisted {} display orders in one call", orders.len());
                return Ok(ReorderOutcome {
                    orders: orders.to_vec(),
                    persistence: Persistence::Bulk,
                });
            }
            Err(e) => e,
        };
        tracing::warn!("Bulk reorder failed, writing photos one by one: {bulk_err}");

        let mut persisted = 0;
        for order in orders {
            match self
                .store
                .update_display_order(order.id, order.display_order)
                .await
            {
                Ok(()) => persisted += 1,
                Err(e) if persisted == 0 => {
                    tracing::error!("Reorder not saved, restoring previous order: {e}");
                    return Err(ReconcileError::Reverted(e));
                }
                Err(e) => {
                    let failed = orders.len() - persisted;
                    tracing::error!(
                        "Reorder saved for {persisted} of {} photos: {e}",
                        orders.len()
                    );
                    return Ok(ReorderOutcome {
                        orders: orders.to_vec(),
                        persistence: Persistence::Partial { persisted, failed },
                    });
                }
            }
        }

        Ok(ReorderOutcome {
            orders: orders.to_vec(),
            persistence: Persistence::RowByRow,
        })
    }
}
