//! Durable asset storage for frame order images.
//!
//! Frame submissions arrive with ephemeral image references (data URLs or
//! short-lived upload previews). Before a frame order row exists, every
//! reference is uploaded to durable storage under one batch prefix. The
//! batch is all-or-nothing: a single failed upload discards the whole batch
//! and the order is never created with mixed references.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::errors::ServiceError;
use crate::services::frame_orders::NewFrameItem;

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `data` under `key` and return the public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<String, ServiceError>;
    /// Remove `key`. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Filesystem-backed store for development and tests.
pub struct LocalAssetStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String, ServiceError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::AssetUploadError(e.to_string()))?;
        }
        fs::write(&path, &data)
            .await
            .map_err(|e| ServiceError::AssetUploadError(e.to_string()))?;
        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key
        ))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.root.join(key);
        if path.exists() {
            fs::remove_file(path)
                .await
                .map_err(|e| ServiceError::AssetUploadError(e.to_string()))?;
        }
        Ok(())
    }
}

/// Object-store/CDN backend speaking plain HTTP PUT/DELETE.
pub struct HttpAssetStore {
    client: reqwest::Client,
    api_base_url: String,
    public_base_url: String,
    api_key: Option<SecretString>,
}

impl HttpAssetStore {
    pub fn new(
        api_base_url: impl Into<String>,
        public_base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            api_base_url: api_base_url.into(),
            public_base_url: public_base_url.into(),
            api_key,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.api_base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, ServiceError> {
        let mut request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(data);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::AssetUploadError(format!("upload failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ServiceError::AssetUploadError(format!(
                "upload failed with status {}",
                response.status()
            )));
        }
        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key
        ))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let mut request = self.client.delete(self.object_url(key));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::AssetUploadError(format!("delete failed: {}", e)))?;
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::AssetUploadError(format!(
                "delete failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Build the configured store backend.
pub fn store_from_config(cfg: &StorageConfig) -> Result<Arc<dyn AssetStore>, ServiceError> {
    match cfg.backend.as_str() {
        "local" => Ok(Arc::new(LocalAssetStore::new(
            cfg.local_root.clone(),
            cfg.public_base_url.clone(),
        ))),
        "http" => {
            let api_base_url = cfg.http_base_url.clone().ok_or_else(|| {
                ServiceError::InternalError(
                    "storage.http_base_url is required for the http backend".to_string(),
                )
            })?;
            Ok(Arc::new(HttpAssetStore::new(
                api_base_url,
                cfg.public_base_url.clone(),
                cfg.http_api_key.clone(),
                Duration::from_secs(cfg.timeout_secs),
            )?))
        }
        other => Err(ServiceError::InternalError(format!(
            "unknown storage backend: {}",
            other
        ))),
    }
}

/// Converts ephemeral image references on frame line items into durable URLs.
pub struct AssetMaterializer {
    store: Arc<dyn AssetStore>,
    fetch: reqwest::Client,
}

impl AssetMaterializer {
    pub fn new(store: Arc<dyn AssetStore>, fetch_timeout: Duration) -> Result<Self, ServiceError> {
        let fetch = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self { store, fetch })
    }

    /// Upload every frame/user image reference concurrently, replacing the
    /// references with permanent URLs.
    ///
    /// All-or-nothing: if any upload fails, every key already written for
    /// this batch is deleted (best effort) and the error propagates.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn materialize(
        &self,
        items: Vec<NewFrameItem>,
    ) -> Result<Vec<NewFrameItem>, ServiceError> {
        let batch = Uuid::new_v4();

        let mut uploads = Vec::with_capacity(items.len() * 2);
        for (i, item) in items.iter().enumerate() {
            uploads.push(self.upload_reference(batch, i, "frame", item.frame_image_url.clone()));
            uploads.push(self.upload_reference(batch, i, "user", item.user_image_url.clone()));
        }

        let results = join_all(uploads).await;

        if results.iter().any(|r| r.is_err()) {
            let uploaded: Vec<String> = results
                .iter()
                .filter_map(|r| r.as_ref().ok().map(|(key, _)| key.clone()))
                .collect();
            warn!(
                %batch,
                uploaded = uploaded.len(),
                "asset batch failed; discarding scratch uploads"
            );
            join_all(uploaded.iter().map(|key| self.store.delete(key))).await;
            let first_err = results
                .into_iter()
                .find_map(Result::err)
                .unwrap_or_else(|| ServiceError::AssetUploadError("upload failed".to_string()));
            return Err(first_err);
        }

        let mut urls = results.into_iter().map(|r| match r {
            Ok((_, url)) => url,
            Err(_) => unreachable!("errors handled above"),
        });

        let mut materialized = Vec::with_capacity(items.len());
        for mut item in items {
            item.frame_image_url = urls.next().expect("one url per upload");
            item.user_image_url = urls.next().expect("one url per upload");
            materialized.push(item);
        }

        info!(%batch, items = materialized.len(), "asset batch materialized");
        Ok(materialized)
    }

    async fn upload_reference(
        &self,
        batch: Uuid,
        index: usize,
        role: &str,
        reference: String,
    ) -> Result<(String, String), ServiceError> {
        let (data, content_type) = self.resolve(&reference).await?;
        let key = format!(
            "frames/{}/item-{}-{}.{}",
            batch,
            index,
            role,
            extension_for(&content_type)
        );
        debug!(%key, bytes = data.len(), "uploading asset");
        let url = self.store.put(&key, data, &content_type).await?;
        Ok((key, url))
    }

    /// Resolve an ephemeral reference to raw bytes.
    async fn resolve(&self, reference: &str) -> Result<(Bytes, String), ServiceError> {
        if let Some(rest) = reference.strip_prefix("data:") {
            let (meta, payload) = rest.split_once(',').ok_or_else(|| {
                ServiceError::ValidationError("malformed data URL".to_string())
            })?;
            let content_type = meta
                .strip_suffix(";base64")
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "data URLs must be base64 encoded".to_string(),
                    )
                })?
                .to_string();
            let data = base64::engine::general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| ServiceError::ValidationError(format!("invalid data URL: {}", e)))?;
            return Ok((Bytes::from(data), content_type));
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            let response = self
                .fetch
                .get(reference)
                .send()
                .await
                .map_err(|e| ServiceError::AssetUploadError(format!("fetch failed: {}", e)))?;
            if !response.status().is_success() {
                return Err(ServiceError::AssetUploadError(format!(
                    "fetch failed with status {}",
                    response.status()
                )));
            }
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = response
                .bytes()
                .await
                .map_err(|e| ServiceError::AssetUploadError(format!("fetch failed: {}", e)))?;
            return Ok((data, content_type));
        }

        Err(ServiceError::ValidationError(format!(
            "unsupported image reference: {}",
            reference
        )))
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
