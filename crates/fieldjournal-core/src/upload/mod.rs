//! Upload orchestration.
//!
//! - **orchestrator**: bounded-concurrency pipelines from file to saved photo
//! - **status**: per-file stage machine and progress events
//! - **board**: the in-memory photo list with upload placeholders
//! - **derive**: location, category and tags computed at save time

pub mod board;
pub mod derive;
pub mod orchestrator;
pub mod status;

pub use board::{BoardEntry, BoardState, PendingPhoto, PhotoBoard};
pub use derive::{extract_tags, format_location, infer_category};
pub use orchestrator::{
    validate_upload, UploadFile, UploadOrchestrator, UploadOutcome, UploadServices, UploadTarget,
};
pub use status::{ProgressFn, QueueStatus, UploadProgress, UploadStage};
