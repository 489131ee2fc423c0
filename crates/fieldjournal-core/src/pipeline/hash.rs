//! Content hashing for storage object names.

use blake3::Hasher as Blake3Hasher;
use uuid::Uuid;

/// Length of the hash prefix used in object names.
const NAME_HASH_LEN: usize = 16;

/// Content hashing for uploaded bytes.
pub struct Hasher;

impl Hasher {
    /// Generate a BLAKE3 hash from an in-memory byte buffer.
    pub fn content_hash(data: &[u8]) -> String {
        let mut hasher = Blake3Hasher::new();
        hasher.update(data);
        hasher.finalize().to_hex().to_string()
    }

    /// Storage path for an object: `<folder>/<gallery>/<upload>-<hash-prefix>.<ext>`.
    ///
    /// Each upload owns its objects; the same bytes uploaded twice get
    /// distinct paths, so deleting one photo never removes another's files.
    pub fn object_path(
        folder: &str,
        gallery_id: Uuid,
        upload_id: &str,
        data: &[u8],
        extension: &str,
    ) -> String {
        let hash = Self::content_hash(data);
        let ext = extension.trim_start_matches('.').to_lowercase();
        format!(
            "{}/{}/{}-{}.{}",
            folder.trim_matches('/'),
            gallery_id,
            upload_id,
            &hash[..NAME_HASH_LEN],
            if ext.is_empty() { "jpg" } else { ext.as_str() }
        )
    }
}

/// File extension for a MIME type, used when naming variants.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/tiff" => "tiff",
        _ => "jpg",
    }
}
