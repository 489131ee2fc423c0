//! File discovery for finding uploadable images in directories.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::UploadConfig;

/// Discovers image files in directories.
pub struct FileDiscovery {
    config: UploadConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// MIME type inferred from the extension
    pub mime_type: &'static str,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Discover all uploadable image files at a path.
    ///
    /// If path is a file, returns it if supported.
    /// If path is a directory, recursively finds all supported files.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return match (self.supported_mime(path), std::fs::metadata(path)) {
                (Some(mime_type), Ok(meta)) => vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                    mime_type,
                }],
                _ => vec![],
            };
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|entry| {
                let mime_type = self.supported_mime(entry.path())?;
                let meta = entry.metadata().ok()?;
                Some(DiscoveredFile {
                    path: entry.path().to_path_buf(),
                    size: meta.len(),
                    mime_type,
                })
            })
            .collect();

        // Sort by path for deterministic upload order
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// MIME type for a path if its extension maps to an allowed type.
    fn supported_mime(&self, path: &Path) -> Option<&'static str> {
        let mime = mime_for_path(path)?;
        self.config
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime))
            .then_some(mime)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

/// Infer an image MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" | "heif" => Some("image/heic"),
        "tif" | "tiff" => Some("image/tiff"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
