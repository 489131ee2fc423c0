//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_concurrent == 0 {
            return Err(invalid("upload.max_concurrent must be > 0"));
        }
        if self.upload.max_file_size_mb == 0 {
            return Err(invalid("upload.max_file_size_mb must be > 0"));
        }
        if self.upload.allowed_types.is_empty() {
            return Err(invalid("upload.allowed_types must not be empty"));
        }
        if self.variants.thumbnail_size == 0 || self.variants.preview_size == 0 {
            return Err(invalid("variants.thumbnail_size and variants.preview_size must be > 0"));
        }
        if self.variants.proxy_max_width == 0 || self.variants.proxy_max_height == 0 {
            return Err(invalid("variants.proxy_max_width and variants.proxy_max_height must be > 0"));
        }
        for (name, quality) in [
            ("variants.thumbnail_quality", self.variants.thumbnail_quality),
            ("variants.preview_quality", self.variants.preview_quality),
            ("variants.proxy_quality", self.variants.proxy_quality),
        ] {
            if quality == 0 || quality > 100 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 1 and 100"
                )));
            }
        }
        if self.vision.timeout_ms == 0 {
            return Err(invalid("vision.timeout_ms must be > 0"));
        }
        if self.vision.retry_attempts == 0 {
            return Err(invalid("vision.retry_attempts must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.vision.temperature) {
            return Err(invalid("vision.temperature must be between 0.0 and 2.0"));
        }
        if self.vision.max_tokens == 0 {
            return Err(invalid("vision.max_tokens must be > 0"));
        }
        if self.store.bucket.trim().is_empty() {
            return Err(invalid("store.bucket must not be empty"));
        }
        if self.store.timeout_ms == 0 {
            return Err(invalid("store.timeout_ms must be > 0"));
        }
        if crate::output::OutputFormat::parse(&self.output.format).is_none() {
            return Err(invalid("output.format must be \"json\" or \"jsonl\""));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("logging.format must be \"pretty\" or \"json\""));
        }
        Ok(())
    }
}
