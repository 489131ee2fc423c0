//! PostgREST-style store over HTTPS.
//!
//! Tables live at `{url}/rest/v1/{table}` and stored procedures at
//! `{url}/rest/v1/rpc/{name}`. Filters use the `column=op.value` query
//! convention and writes ask for `Prefer: return=representation` so the
//! changed rows come back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rows::{
    GalleryInsert, GalleryRow, GalleryUpdate, PhotoInsert, PhotoRow, PhotoUpdate,
};
use super::{unique_slug, GalleryStore};
use crate::config::{resolve_env_var, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::types::{
    slugify, Gallery, GalleryPatch, NewGallery, NewPhoto, Photo, PhotoOrder, PhotoPatch,
    Telemetry,
};

const GALLERIES: &str = "galleries";
const PHOTOS: &str = "photos";

/// Authenticated HTTP connection shared by the table client and object storage.
pub(crate) struct Connection {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl Connection {
    pub(crate) fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let base_url = resolve_env_var(&config.url)
            .ok_or_else(|| StoreError::NotConfigured("store URL not set (store.url)".to_string()))?;
        let api_key = resolve_env_var(&config.api_key).ok_or_else(|| {
            StoreError::NotConfigured("store API key not set (store.api_key)".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Send and map transport failures and non-2xx statuses.
    pub(crate) async fn send(request: RequestBuilder) -> StoreResult<Response> {
        let resp = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> StoreResult<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| StoreError::Network(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn first<T>(rows: Vec<T>, resource: &'static str, key: impl ToString) -> StoreResult<T> {
    rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
        resource,
        key: key.to_string(),
    })
}

#[derive(Deserialize)]
struct OrderRow {
    display_order: i32,
}

#[derive(Serialize)]
struct ReorderArgs {
    p_gallery_id: Uuid,
    p_photo_orders: Vec<ReorderItem>,
}

#[derive(Serialize)]
struct ReorderItem {
    photo_id: Uuid,
    display_order: i32,
}

#[derive(Serialize)]
struct ViewArgs {
    photo_id: Uuid,
}

/// Gallery store backed by the database REST interface.
pub struct RestStore {
    conn: Connection,
    reorder_rpc: String,
    view_rpc: String,
}

impl RestStore {
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            conn: Connection::from_config(config)?,
            reorder_rpc: config.reorder_rpc.clone(),
            view_rpc: config.view_rpc.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.conn.base_url())
    }

    fn rpc_url(&self, name: &str) -> String {
        format!("{}/rest/v1/rpc/{name}", self.conn.base_url())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        let request = self
            .conn
            .authorized(self.conn.client().get(self.table_url(table)))
            .query(query);
        decode(Connection::send(request).await?).await
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let request = self
            .conn
            .authorized(self.conn.client().post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(body);
        decode(Connection::send(request).await?).await
    }

    async fn patch<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let request = self
            .conn
            .authorized(self.conn.client().patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(query)
            .json(body);
        decode(Connection::send(request).await?).await
    }

    async fn delete_where(&self, table: &str, query: &[(&str, String)]) -> StoreResult<usize> {
        let request = self
            .conn
            .authorized(self.conn.client().delete(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(query);
        let rows: Vec<IgnoredAny> = decode(Connection::send(request).await?).await?;
        Ok(rows.len())
    }

    async fn rpc<B: Serialize + Sync>(&self, name: &str, args: &B) -> StoreResult<()> {
        let request = self
            .conn
            .authorized(self.conn.client().post(self.rpc_url(name)))
            .json(args);
        Connection::send(request).await.map(|_| ())
    }

    async fn patch_photo(&self, id: Uuid, body: &PhotoUpdate) -> StoreResult<Photo> {
        let rows: Vec<PhotoRow> = self.patch(PHOTOS, &[("id", eq(id))], body).await?;
        first(rows, "photo", id).map(Photo::from)
    }
}

#[async_trait]
impl GalleryStore for RestStore {
    async fn list_galleries(&self, published_only: bool) -> StoreResult<Vec<Gallery>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("is_active", eq(true)),
            ("order", "created_at.desc".to_string()),
        ];
        if published_only {
            query.push(("is_published", eq(true)));
        }
        let rows: Vec<GalleryRow> = self.select(GALLERIES, &query).await?;
        Ok(rows.into_iter().map(Gallery::from).collect())
    }

    async fn get_gallery(&self, id: Uuid) -> StoreResult<Gallery> {
        let rows: Vec<GalleryRow> = self
            .select(GALLERIES, &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        first(rows, "gallery", id).map(Gallery::from)
    }

    async fn get_gallery_by_slug(&self, slug: &str) -> StoreResult<Gallery> {
        let rows: Vec<GalleryRow> = self
            .select(
                GALLERIES,
                &[
                    ("select", "*".to_string()),
                    ("slug", eq(slug)),
                    ("is_active", eq(true)),
                ],
            )
            .await?;
        first(rows, "gallery", slug).map(Gallery::from)
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        let rows: Vec<IgnoredAny> = self
            .select(
                GALLERIES,
                &[
                    ("select", "id".to_string()),
                    ("slug", eq(slug)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn insert_gallery(&self, gallery: &NewGallery, slug: &str) -> StoreResult<Gallery> {
        let rows: Vec<GalleryRow> = self
            .insert(GALLERIES, &GalleryInsert::new(gallery, slug))
            .await?;
        let created = first(rows, "gallery", slug).map(Gallery::from)?;
        tracing::info!("Created gallery {} ({})", created.slug, created.id);
        Ok(created)
    }

    async fn update_gallery(&self, id: Uuid, patch: &GalleryPatch) -> StoreResult<Gallery> {
        let slug = match &patch.title {
            Some(title) => {
                let current = self.get_gallery(id).await?;
                if slugify(title) == current.slug {
                    None
                } else {
                    Some(unique_slug(self, title).await?)
                }
            }
            None => None,
        };
        let rows: Vec<GalleryRow> = self
            .patch(GALLERIES, &[("id", eq(id))], &GalleryUpdate::new(patch, slug))
            .await?;
        first(rows, "gallery", id).map(Gallery::from)
    }

    async fn delete_gallery(&self, id: Uuid) -> StoreResult<()> {
        match self.delete_where(GALLERIES, &[("id", eq(id))]).await? {
            0 => Err(StoreError::NotFound {
                resource: "gallery",
                key: id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn list_photos(&self, gallery_id: Uuid, published_only: bool) -> StoreResult<Vec<Photo>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("gallery_id", eq(gallery_id)),
            ("order", "display_order.asc,created_at.asc".to_string()),
        ];
        if published_only {
            query.push(("is_published", eq(true)));
        }
        let rows: Vec<PhotoRow> = self.select(PHOTOS, &query).await?;
        Ok(rows.into_iter().map(Photo::from).collect())
    }

    async fn list_featured(&self, limit: usize) -> StoreResult<Vec<Photo>> {
        let rows: Vec<PhotoRow> = self.select(PHOTOS, &featured_query(limit)).await?;
        Ok(rows.into_iter().map(Photo::from).collect())
    }

    async fn get_photo(&self, id: Uuid) -> StoreResult<Photo> {
        let rows: Vec<PhotoRow> = self
            .select(PHOTOS, &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        first(rows, "photo", id).map(Photo::from)
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> StoreResult<Photo> {
        let rows: Vec<PhotoRow> = self.insert(PHOTOS, &PhotoInsert::from(photo)).await?;
        first(rows, "photo", &photo.image_url).map(Photo::from)
    }

    async fn update_photo(&self, id: Uuid, patch: &PhotoPatch) -> StoreResult<Photo> {
        self.patch_photo(id, &PhotoUpdate::from(patch)).await
    }

    async fn delete_photo(&self, id: Uuid) -> StoreResult<()> {
        match self.delete_where(PHOTOS, &[("id", eq(id))]).await? {
            0 => Err(StoreError::NotFound {
                resource: "photo",
                key: id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn max_display_order(&self, gallery_id: Uuid) -> StoreResult<i32> {
        let rows: Vec<OrderRow> = self
            .select(
                PHOTOS,
                &[
                    ("select", "display_order".to_string()),
                    ("gallery_id", eq(gallery_id)),
                    ("order", "display_order.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.first().map(|r| r.display_order).unwrap_or(0))
    }

    async fn batch_publish(&self, ids: &[Uuid], is_published: bool) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let rows: Vec<IgnoredAny> = self
            .patch(
                PHOTOS,
                &[("select", "id".to_string()), ("id", format!("in.({list})"))],
                &PhotoUpdate::published(is_published),
            )
            .await?;
        Ok(rows.len())
    }

    async fn reorder_bulk(&self, gallery_id: Uuid, orders: &[PhotoOrder]) -> StoreResult<()> {
        let args = ReorderArgs {
            p_gallery_id: gallery_id,
            p_photo_orders: orders
                .iter()
                .map(|o| ReorderItem {
                    photo_id: o.id,
                    display_order: o.display_order,
                })
                .collect(),
        };
        self.rpc(&self.reorder_rpc, &args).await
    }

    async fn update_display_order(&self, id: Uuid, display_order: i32) -> StoreResult<()> {
        self.patch_photo(id, &PhotoUpdate::display_order(display_order))
            .await
            .map(|_| ())
    }

    async fn clear_featured(&self, gallery_id: Uuid) -> StoreResult<()> {
        let _: Vec<IgnoredAny> = self
            .patch(
                PHOTOS,
                &[
                    ("select", "id".to_string()),
                    ("gallery_id", eq(gallery_id)),
                    ("is_featured", eq(true)),
                ],
                &PhotoUpdate::featured(false),
            )
            .await?;
        Ok(())
    }

    async fn set_featured(&self, id: Uuid, is_featured: bool) -> StoreResult<()> {
        self.patch_photo(id, &PhotoUpdate::featured(is_featured))
            .await
            .map(|_| ())
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<()> {
        match self.rpc(&self.view_rpc, &ViewArgs { photo_id: id }).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!("View RPC failed ({e}), falling back to read-modify-write");
                let photo = self.get_photo(id).await?;
                let telemetry = Telemetry {
                    views: photo.telemetry.views.saturating_add(1),
                    ..photo.telemetry
                };
                self.patch_photo(id, &PhotoUpdate::telemetry(telemetry))
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn update_telemetry(&self, id: Uuid, telemetry: Telemetry) -> StoreResult<Photo> {
        self.patch_photo(id, &PhotoUpdate::telemetry(telemetry)).await
    }
}

/// Featured, published photos whose gallery is still active.
///
/// The inner embed drops rows whose gallery fails the `is_active` filter.
fn featured_query(limit: usize) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*,galleries!inner(is_active)".to_string()),
        ("is_featured", eq(true)),
        ("is_published", eq(true)),
        ("galleries.is_active", eq(true)),
        ("order", "created_at.desc".to_string()),
        ("limit", limit.to_string()),
    ]
}
