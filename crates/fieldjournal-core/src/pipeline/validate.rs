//! Upload validation before any remote call.

use crate::config::UploadConfig;
use crate::error::ValidationError;

/// Validates uploaded files against the type allow-list and size ceiling.
pub struct UploadValidator {
    config: UploadConfig,
}

impl UploadValidator {
    /// Create a new validator with the given upload settings.
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Check a file before it enters the upload pipeline.
    ///
    /// Checks:
    /// - Declared MIME type is on the allow-list
    /// - File size is within the ceiling
    /// - Header bytes belong to an allowed image format
    pub fn validate(&self, mime_type: &str, data: &[u8]) -> Result<(), ValidationError> {
        if !self.is_allowed(mime_type) {
            return Err(ValidationError::new(
                "mime_type",
                format!(
                    "Invalid file type: {mime_type}. Allowed: {}",
                    self.config.allowed_types.join(", ")
                ),
            ));
        }

        let size = data.len() as u64;
        if size == 0 {
            return Err(ValidationError::new("size", "File is empty"));
        }
        if size > self.config.max_file_size_bytes() {
            return Err(ValidationError::new(
                "size",
                format!(
                    "File too large: {:.1}MB. Max: {}MB",
                    size as f64 / 1024.0 / 1024.0,
                    self.config.max_file_size_mb
                ),
            ));
        }

        match sniff_mime(data) {
            Some(sniffed) if self.is_allowed(sniffed) => Ok(()),
            Some(sniffed) => Err(ValidationError::new(
                "content",
                format!("File content is {sniffed}, which is not an allowed type"),
            )),
            None => Err(ValidationError::new(
                "content",
                "Unrecognized image format (invalid magic bytes)",
            )),
        }
    }

    fn is_allowed(&self, mime_type: &str) -> bool {
        self.config
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type.trim()))
    }
}

/// Identify an image format from its leading bytes.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    let header = &data[..data.len().min(12)];
    if header.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some("image/png");
    }

    // GIF: GIF8
    if header.starts_with(b"GIF8") {
        return Some("image/gif");
    }

    // WebP: RIFF....WEBP
    if header.starts_with(b"RIFF") && header.len() >= 12 && &header[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    // TIFF: II*\0 or MM\0*
    if header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A]) {
        return Some("image/tiff");
    }

    // HEIC/HEIF: ftyp box at offset 4
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        return Some("image/heic");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEADER: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1];

    fn validator() -> UploadValidator {
        UploadValidator::new(UploadConfig::default())
    }

    #[test]
    fn test_sniff_formats() {
        assert_eq!(sniff_mime(&JPEG_HEADER), Some("image/jpeg"));
        assert_eq!(
            sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("image/png")
        );
        assert_eq!(
            sniff_mime(&[b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P']),
            Some("image/webp")
        );
        assert_eq!(sniff_mime(&[b'I', b'I', 0x2A, 0x00]), Some("image/tiff"));
        assert_eq!(sniff_mime(&[b'M', b'M', 0x00, 0x2A]), Some("image/tiff"));
        assert_eq!(
            sniff_mime(&[0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c']),
            Some("image/heic")
        );
    }

    #[test]
    fn test_sniff_rejects_garbage() {
        assert_eq!(sniff_mime(&[0u8; 12]), None);
        assert_eq!(sniff_mime(&[b'I', b'I', 0x00, 0x00]), None);
        assert_eq!(sniff_mime(&[0xFF, 0xD8]), None);
        // RIFF container that is not WebP (e.g. WAV)
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WAVE"), None);
    }

    #[test]
    fn test_validate_accepts_jpeg() {
        assert!(validator().validate("image/jpeg", &JPEG_HEADER).is_ok());
        assert!(validator().validate("IMAGE/JPEG", &JPEG_HEADER).is_ok());
    }

    #[test]
    fn test_validate_rejects_disallowed_type() {
        let err = validator().validate("image/gif", b"GIF89a......").unwrap_err();
        assert_eq!(err.field, "mime_type");
        assert!(err.message.contains("image/gif"));
    }

    #[test]
    fn test_validate_rejects_oversize() {
        let config = UploadConfig {
            max_file_size_mb: 1,
            ..UploadConfig::default()
        };
        let mut data = JPEG_HEADER.to_vec();
        data.resize(1024 * 1024 + 1, 0);
        let err = UploadValidator::new(config).validate("image/jpeg", &data).unwrap_err();
        assert_eq!(err.field, "size");
        assert!(err.message.contains("Max: 1MB"));
    }

    #[test]
    fn test_validate_rejects_empty_and_mislabelled() {
        assert_eq!(validator().validate("image/png", &[]).unwrap_err().field, "size");
        let err = validator().validate("image/png", b"GIF89a......").unwrap_err();
        assert_eq!(err.field, "content");
        let err = validator().validate("image/png", b"not an image at all").unwrap_err();
        assert_eq!(err.field, "content");
    }
}
