//! Reconciling the operator's local photo and gallery state with the store.
//!
//! - **reorder**: drag-and-drop renumbering with bulk and per-row persistence
//! - **publish**: published/draft bins with compensating rollback
//! - **featured**: one featured photo per gallery

pub mod featured;
pub mod publish;
pub mod reorder;

pub use featured::FeaturedSelector;
pub use publish::{Bin, BinMove, GalleryBins, PublishReconciler};
pub use reorder::{move_item, renumber, Persistence, ReorderOutcome, Reorderer};
