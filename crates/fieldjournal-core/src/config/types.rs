//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Upload validation and pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Accepted MIME types
    pub allowed_types: Vec<String>,

    /// Maximum number of file pipelines in flight at once
    pub max_concurrent: usize,

    /// Publish new photos immediately
    pub auto_publish: bool,

    /// Extract EXIF and GPS metadata
    pub extract_metadata: bool,

    /// Run vision analysis after upload
    pub analyze_ai: bool,

    /// Storage folder for originals (under the gallery id)
    pub storage_folder: String,

    /// Storage folder for AI proxies
    pub proxy_folder: String,

    /// Storage folder for grid thumbnails
    pub thumbnail_folder: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
                "image/heic".to_string(),
                "image/tiff".to_string(),
            ],
            max_concurrent: 3,
            auto_publish: true,
            extract_metadata: true,
            analyze_ai: true,
            storage_folder: "photos".to_string(),
            proxy_folder: "ai-proxy".to_string(),
            thumbnail_folder: "thumbnails".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// Image variant sizes and encoder qualities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Square grid thumbnail edge in pixels
    pub thumbnail_size: u32,

    /// JPEG quality for thumbnails (0-100)
    pub thumbnail_quality: u8,

    /// Square preview edge in pixels
    pub preview_size: u32,

    /// JPEG quality for previews (0-100)
    pub preview_quality: u8,

    /// AI proxy bounding box
    pub proxy_max_width: u32,
    pub proxy_max_height: u32,

    /// JPEG quality for the AI proxy (0-100)
    pub proxy_quality: u8,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 300,
            thumbnail_quality: 70,
            preview_size: 800,
            preview_quality: 80,
            proxy_max_width: 1000,
            proxy_max_height: 1000,
            proxy_quality: 80,
        }
    }
}

/// Prompt persona used for photo analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Documentary editor: topographical / observational / technical keywords
    #[default]
    FieldJournal,
    /// Wildlife guide: wildlife / landscape / technical / artistic / emotional / location
    Safari,
}

/// Vision model endpoint and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Max tokens per reply
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Hard per-request deadline in milliseconds
    pub timeout_ms: u64,

    /// Total attempts including the first
    pub retry_attempts: u32,

    /// First backoff delay in milliseconds, doubled each retry
    pub retry_delay_ms: u64,

    /// Pause between calls in batch mode
    pub batch_delay_ms: u64,

    /// Prompt persona
    pub prompt_variant: PromptVariant,

    /// Header carrying a per-analysis idempotency key, if the provider supports one
    pub idempotency_header: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.minimax.io/v1/text/chatcompletion_v2".to_string(),
            api_key: "${MINIMAX_API_KEY}".to_string(),
            model: "MiniMax-M2".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout_ms: 60_000,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            batch_delay_ms: 200,
            prompt_variant: PromptVariant::FieldJournal,
            idempotency_header: None,
        }
    }
}

/// Gallery store and object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base project URL (REST at `/rest/v1`, storage at `/storage/v1`)
    pub url: String,

    /// Service key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Storage bucket for photo objects
    pub bucket: String,

    /// Stored procedure for bulk reorder
    pub reorder_rpc: String,

    /// Stored procedure for atomic view increments
    pub view_rpc: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "${SUPABASE_URL}".to_string(),
            api_key: "${SUPABASE_SERVICE_KEY}".to_string(),
            bucket: "gallery-images".to_string(),
            reorder_rpc: "reorder_photos".to_string(),
            view_rpc: "increment_view_count".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Expand `${ENV_VAR}` references in a config value.
///
/// Returns `None` when the result is empty, so an unset variable reads as
/// "not configured" rather than a literal placeholder.
pub fn resolve_env_var(value: &str) -> Option<String> {
    let expanded =
        shellexpand::env_with_context_no_errors(value, |var| Some(std::env::var(var).unwrap_or_default()));
    let expanded = expanded.trim();
    if expanded.is_empty() {
        None
    } else {
        Some(expanded.to_string())
    }
}
