//! Error types for the Field Journal upload and enrichment pipeline.
//!
//! Errors are organized by concern so callers can tell a rejected file apart
//! from a slow model or an unreachable store, and decide whether to degrade
//! or fail.

use thiserror::Error;

/// Top-level error type for Field Journal operations.
#[derive(Error, Debug)]
pub enum FieldJournalError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Vision model errors
    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    /// Gallery/photo store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Upload pipeline errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Reorder, publish or featured reconciliation errors
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// A field-level validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field (e.g. "mime_type", "orders[2].displayOrder")
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors from the external vision model.
#[derive(Error, Debug, Clone)]
pub enum VisionError {
    /// Model endpoint answered with a non-success status
    #[error("Vision model HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection, DNS or transport failure before a response arrived
    #[error("Vision model network error: {0}")]
    Network(String),

    /// The per-request deadline expired
    #[error("Vision model request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The request was aborted before completion
    #[error("Vision model request aborted: {0}")]
    Aborted(String),

    /// The reply had no usable content
    #[error("Vision model returned no content")]
    EmptyReply,

    /// The reply body could not be decoded
    #[error("Failed to decode vision model response: {0}")]
    Decode(String),

    /// No API key or endpoint configured
    #[error("Vision model not configured: {0}")]
    NotConfigured(String),
}

/// Errors from the gallery/photo store and object storage.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Store answered with a non-success status
    #[error("Store HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection or transport failure
    #[error("Store network error: {0}")]
    Network(String),

    /// Response body did not match the expected rows
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// No row matched the lookup
    #[error("{resource} not found: {key}")]
    NotFound { resource: &'static str, key: String },

    /// Request refused before reaching the store
    #[error("Invalid store request: {0}")]
    InvalidInput(String),

    /// Missing URL or key
    #[error("Store not configured: {0}")]
    NotConfigured(String),
}

/// Errors from the upload orchestrator, organized by stage.
#[derive(Error, Debug)]
pub enum UploadError {
    /// File rejected before upload
    #[error("Validation failed for {file_name}: {source}")]
    Validation {
        file_name: String,
        #[source]
        source: ValidationError,
    },

    /// Storage upload of the original failed
    #[error("Upload to storage failed for {file_name}: {source}")]
    Storage {
        file_name: String,
        #[source]
        source: StoreError,
    },

    /// Database insert failed after storage succeeded
    #[error("Failed to save {file_name} to database: {source}")]
    Save {
        file_name: String,
        #[source]
        source: StoreError,
    },

    /// A blocking image task or pipeline task failed to join
    #[error("Pipeline task failed for {file_name}: {message}")]
    Task { file_name: String, message: String },

    /// Cancelled while waiting for an upload slot
    #[error("Upload of {file_name} cancelled by user")]
    Cancelled { file_name: String },
}

impl UploadError {
    /// File name the failure belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            Self::Validation { file_name, .. }
            | Self::Storage { file_name, .. }
            | Self::Save { file_name, .. }
            | Self::Task { file_name, .. }
            | Self::Cancelled { file_name } => file_name,
        }
    }
}

/// Errors from reconciling local photo/gallery state with the store.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A drag source or target outside the list
    #[error("Position {index} is out of range for {len} photos")]
    OutOfRange { index: usize, len: usize },

    /// The photo or gallery is not on the local board
    #[error("{resource} {id} is not loaded")]
    NotLoaded { resource: &'static str, id: uuid::Uuid },

    /// Request payload rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Nothing was persisted; the local change was undone
    #[error("Store write failed, local change reverted: {0}")]
    Reverted(#[source] StoreError),

    /// The store rejected the write; local state was not changed
    #[error("Store write failed: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for Field Journal results.
pub type Result<T> = std::result::Result<T, FieldJournalError>;

/// Convenience type alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
