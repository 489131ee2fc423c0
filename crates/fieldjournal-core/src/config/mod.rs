//! Configuration management for Field Journal.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every section, so an empty or missing file is a valid configuration.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Field Journal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upload validation and pipeline settings
    pub upload: UploadConfig,

    /// Image variant settings
    pub variants: VariantConfig,

    /// Vision model settings
    pub vision: VisionConfig,

    /// Gallery store settings
    pub store: StoreConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.fieldjournal.fieldjournal/config.toml
    /// - Linux: ~/.config/fieldjournal/config.toml
    ///
    /// Falls back to ~/.fieldjournal/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "fieldjournal", "fieldjournal")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".fieldjournal").join("config.toml")
            })
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.upload.max_concurrent, 3);
        assert_eq!(config.upload.max_file_size_mb, 50);
        assert_eq!(config.vision.retry_attempts, 3);
        assert_eq!(config.vision.retry_delay_ms, 2000);
        assert_eq!(config.vision.timeout_ms, 60_000);
        assert_eq!(config.variants.proxy_max_width, 1000);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[upload]"));
        assert!(toml.contains("[vision]"));
        assert!(toml.contains("[store]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [vision]
            model = "MiniMax-Text-01"
            prompt_variant = "safari"

            [upload]
            max_concurrent = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.vision.model, "MiniMax-Text-01");
        assert_eq!(config.vision.prompt_variant, PromptVariant::Safari);
        assert_eq!(config.vision.max_tokens, 2000);
        assert_eq!(config.upload.max_concurrent, 5);
        assert_eq!(config.variants.thumbnail_size, 300);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nbucket = \"field-photos\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store.bucket, "field-photos");
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[upload]\nmax_concurrent = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));
    }
}
