//! Byte-level object stores the snapshot ledger persists through.

#![allow(async_fn_in_trait)]

use bot_core::{CoreError, StorageError};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Whole-object get/put keyed by bucket and key.
pub trait ObjectStore {
    /// `Ok(None)` when the object does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, CoreError>;
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), CoreError>;
}

/// Objects as files under `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl ObjectStore for FileObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let path = self.path(bucket, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No object at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(StorageError::Unavailable {
                location: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), CoreError> {
        let path = self.path(bucket, key);
        let unavailable = |e: std::io::Error| StorageError::Unavailable {
            location: path.display().to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        // Readers never see a half-written snapshot
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, body).await.map_err(unavailable)?;
        tokio::fs::rename(&staging, &path).await.map_err(unavailable)?;
        Ok(())
    }
}

/// Objects behind a plain HTTP endpoint: `GET`/`PUT <base_url>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, CoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let url = self.object_url(bucket, key);
        let unavailable = |reason: String| StorageError::Unavailable {
            location: url.clone(),
            reason,
        };

        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("No object at {}", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(unavailable(format!("status {}", status)).into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(Some(body.to_vec()))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), CoreError> {
        let url = self.object_url(bucket, key);

        let response = self
            .authorize(self.http_client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable {
                location: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::WriteRejected {
                location: url,
                status_code: status.as_u16(),
            }
            .into());
        }
        Ok(())
    }
}

/// In-process store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self, bucket: &str, key: &str) -> Result<(), CoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                location: format!("memory://{}/{}", bucket, key),
                reason: "store marked unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        self.check_available(bucket, key)?;
        let objects = self.objects.read().await;
        Ok(objects.get(&(bucket.to_string(), key.to_string())).cloned())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), CoreError> {
        self.check_available(bucket, key)?;
        let mut objects = self.objects.write().await;
        objects.insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}

/// Store selected at runtime from configuration.
#[derive(Debug)]
pub enum AnyObjectStore {
    File(FileObjectStore),
    Http(HttpObjectStore),
    Memory(MemoryObjectStore),
}

impl ObjectStore for AnyObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        match self {
            AnyObjectStore::File(store) => store.get_object(bucket, key).await,
            AnyObjectStore::Http(store) => store.get_object(bucket, key).await,
            AnyObjectStore::Memory(store) => store.get_object(bucket, key).await,
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), CoreError> {
        match self {
            AnyObjectStore::File(store) => store.put_object(bucket, key, body).await,
            AnyObjectStore::Http(store) => store.put_object(bucket, key, body).await,
            AnyObjectStore::Memory(store) => store.put_object(bucket, key, body).await,
        }
    }
}
