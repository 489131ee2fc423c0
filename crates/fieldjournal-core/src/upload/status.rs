//! Per-file upload state machine, progress events and queue accounting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use uuid::Uuid;

/// Stage of one file's upload.
///
/// `Pending → Uploading → ExtractingMetadata → AnalyzingAi → Saving → Complete`,
/// with `Error` reachable from every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Pending,
    Uploading,
    ExtractingMetadata,
    AnalyzingAi,
    Saving,
    Complete,
    Error,
}

impl UploadStage {
    /// Progress range `(start, end)` in percent.
    pub fn band(self) -> (u8, u8) {
        match self {
            Self::Pending => (0, 0),
            Self::Uploading => (10, 30),
            Self::ExtractingMetadata => (30, 55),
            Self::AnalyzingAi => (55, 90),
            Self::Saving => (90, 100),
            Self::Complete => (100, 100),
            Self::Error => (0, 0),
        }
    }

    /// Short status line shown to the operator.
    pub fn message(self) -> &'static str {
        match self {
            Self::Pending => "Waiting...",
            Self::Uploading => "Uploading...",
            Self::ExtractingMetadata => "Extracting metadata...",
            Self::AnalyzingAi => "AI analyzing...",
            Self::Saving => "Saving to database...",
            Self::Complete => "Done!",
            Self::Error => "Upload failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// A progress event for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    /// Temporary id assigned when the file entered the queue
    pub upload_id: String,
    pub file_name: String,
    pub stage: UploadStage,
    /// 0-100, never decreasing until a terminal stage
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<Uuid>,
}

/// Totals over every upload the orchestrator has tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Uploads past `Pending` that have not finished
    pub active: usize,
}

/// `upload_<unix millis>_<random hex>`, unique per queued file.
fn temp_upload_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("upload_{millis}_{:08x}", rand::random::<u32>())
}

/// Callback receiving every progress event.
pub type ProgressFn = Arc<dyn Fn(&UploadProgress) + Send + Sync>;

/// Tracks the latest state of every upload and forwards events.
#[derive(Default)]
pub(crate) struct Tracker {
    entries: Mutex<HashMap<String, UploadProgress>>,
    listener: Mutex<Option<ProgressFn>>,
}

impl Tracker {
    pub(crate) fn set_listener(&self, listener: Option<ProgressFn>) {
        if let Ok(mut slot) = self.listener.lock() {
            *slot = listener;
        }
    }

    /// Register a new upload in `Pending`.
    pub(crate) fn register(&self, file_name: &str) -> String {
        let upload_id = temp_upload_id();
        self.emit(UploadProgress {
            upload_id: upload_id.clone(),
            file_name: file_name.to_string(),
            stage: UploadStage::Pending,
            progress: 0,
            message: UploadStage::Pending.message().to_string(),
            photo_id: None,
        });
        upload_id
    }

    /// Move to `stage` at `fraction` (0.0-1.0) of its band.
    ///
    /// Terminal uploads are frozen and progress never goes backwards.
    pub(crate) fn advance(&self, upload_id: &str, stage: UploadStage, fraction: f32) {
        let (start, end) = stage.band();
        let span = f32::from(end - start) * fraction.clamp(0.0, 1.0);
        let percent = start.saturating_add(span.round() as u8);

        let event = {
            let Ok(entries) = self.entries.lock() else {
                return;
            };
            let Some(current) = entries.get(upload_id) else {
                return;
            };
            if current.stage.is_terminal() {
                return;
            }
            UploadProgress {
                stage,
                progress: percent.max(current.progress),
                message: stage.message().to_string(),
                ..current.clone()
            }
        };
        self.emit(event);
    }

    pub(crate) fn complete(&self, upload_id: &str, photo_id: Uuid) {
        let message = UploadStage::Complete.message().to_string();
        self.finish(upload_id, UploadStage::Complete, 100, message, Some(photo_id));
    }

    /// Terminal error; `message` is already prefixed with its context.
    pub(crate) fn fail(&self, upload_id: &str, message: String) {
        self.finish(upload_id, UploadStage::Error, 0, message, None);
    }

    fn finish(
        &self,
        upload_id: &str,
        stage: UploadStage,
        progress: u8,
        message: String,
        photo_id: Option<Uuid>,
    ) {
        let event = {
            let Ok(entries) = self.entries.lock() else {
                return;
            };
            let Some(current) = entries.get(upload_id) else {
                return;
            };
            if current.stage.is_terminal() {
                return;
            }
            UploadProgress {
                stage,
                progress,
                message,
                photo_id,
                ..current.clone()
            }
        };
        self.emit(event);
    }

    pub(crate) fn stage(&self, upload_id: &str) -> Option<UploadStage> {
        self.entries
            .lock()
            .ok()
            .and_then(|e| e.get(upload_id).map(|p| p.stage))
    }

    /// Upload ids still waiting for a slot.
    pub(crate) fn pending_ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|e| {
                e.values()
                    .filter(|p| p.stage == UploadStage::Pending)
                    .map(|p| p.upload_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Forget uploads that reached `Complete` or `Error`. Returns how many.
    pub(crate) fn prune_finished(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, p| !p.stage.is_terminal());
        before - entries.len()
    }

    pub(crate) fn status(&self) -> QueueStatus {
        let Ok(entries) = self.entries.lock() else {
            return QueueStatus::default();
        };
        let mut status = QueueStatus {
            total: entries.len(),
            ..QueueStatus::default()
        };
        for entry in entries.values() {
            match entry.stage {
                UploadStage::Complete => status.completed += 1,
                UploadStage::Error => status.failed += 1,
                UploadStage::Pending => {}
                _ => status.active += 1,
            }
        }
        status
    }

    fn emit(&self, event: UploadProgress) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(event.upload_id.clone(), event.clone());
        }
        let listener = self.listener.lock().ok().and_then(|l| l.clone());
        if let Some(listener) = listener {
            listener(&event);
        }
    }
}
