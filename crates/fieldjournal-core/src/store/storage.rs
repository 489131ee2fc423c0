//! Object storage for original images, thumbnails and AI proxies.

use async_trait::async_trait;

use super::rest::Connection;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Public-URL object storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes at `path` (overwriting) and return the public URL.
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StoreResult<String>;

    /// Remove the object at `path`.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Public URL for `path`.
    fn public_url(&self, path: &str) -> String;

    /// Recover the object path from a public URL produced by this storage.
    fn path_from_url(&self, url: &str) -> Option<String> {
        let prefix = self.public_url("");
        url.strip_prefix(&prefix)
            .filter(|p| !p.is_empty())
            .map(String::from)
    }
}

/// Bucket storage behind the `/storage/v1` HTTP interface.
pub struct RestObjectStorage {
    conn: Connection,
    bucket: String,
}

impl RestObjectStorage {
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            conn: Connection::from_config(config)?,
            bucket: config.bucket.clone(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.conn.base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStorage for RestObjectStorage {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StoreResult<String> {
        let size = data.len();
        let request = self
            .conn
            .authorized(self.conn.client().post(self.object_url(path)))
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "true")
            .body(data);
        Connection::send(request).await?;
        tracing::debug!("Stored {path} ({size} bytes)");
        Ok(self.public_url(path))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let request = self
            .conn
            .authorized(self.conn.client().delete(self.object_url(path)));
        match Connection::send(request).await {
            Ok(_) => Ok(()),
            Err(StoreError::Http { status: 404, .. }) => Err(StoreError::NotFound {
                resource: "object",
                key: path.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.conn.base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> RestObjectStorage {
        let config = StoreConfig {
            url: "https://db.example.co/".to_string(),
            api_key: "service-key".to_string(),
            ..StoreConfig::default()
        };
        RestObjectStorage::from_config(&config).unwrap()
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            storage().public_url("photos/g1/abc.jpg"),
            "https://db.example.co/storage/v1/object/public/gallery-images/photos/g1/abc.jpg"
        );
    }

    #[test]
    fn test_path_round_trips_through_public_url() {
        let s = storage();
        let url = s.public_url("thumbnails/g1/abc.jpg");
        assert_eq!(s.path_from_url(&url).as_deref(), Some("thumbnails/g1/abc.jpg"));
        assert_eq!(s.path_from_url("https://elsewhere.example/x.jpg"), None);
    }
}
