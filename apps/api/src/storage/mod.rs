//! Blob storage for rendered images and content snapshots.
//!
//! `AppState` and the pipeline carry an `Arc<dyn BlobStore>`; the backend is chosen at
//! startup from `STORAGE_BACKEND` (`local` directory tree or S3/MinIO bucket).
//! Keys are `/`-separated and scoped by the job namespace:
//! `[prefix/]{YYYY-MM-DD}/{YYYYMMDD_HHMMSS.mmm}/{file}`.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::S3Settings;
use crate::layout::templates::TemplateId;

pub const PNG_CONTENT_TYPE: &str = "image/png";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("failed to access '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("S3 request for '{key}' failed: {message}")]
    S3 { key: String, message: String },
}

/// Opaque key-value blob store. Writes are whole-object puts.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Reads a whole object. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// Keys
// ────────────────────────────────────────────────────────────────────────────

/// Per-job key prefix with millisecond resolution so concurrent jobs never collide.
pub fn job_namespace(prefix: Option<&str>, now: DateTime<Utc>) -> String {
    let stamp = format!(
        "{}/{}",
        now.format("%Y-%m-%d"),
        now.format("%Y%m%d_%H%M%S%.3f")
    );
    match prefix.map(|p| p.trim().trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(p) => format!("{p}/{stamp}"),
        None => stamp,
    }
}

pub fn image_key(namespace: &str, template: TemplateId) -> String {
    format!("{namespace}/{template}.png")
}

pub fn content_key(namespace: &str) -> String {
    format!("{namespace}/content.json")
}

// ────────────────────────────────────────────────────────────────────────────
// Backend selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Local,
    S3,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StoreBackend::Local),
            "s3" => Ok(StoreBackend::S3),
            other => Err(format!("unknown storage backend '{other}' (expected local or s3)")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LocalBlobStore
// ────────────────────────────────────────────────────────────────────────────

/// Writes blobs as files under a root directory, creating parents as needed.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `key` under the root. Rejects absolute paths and `..` segments.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, &bytes).await.map_err(io_err)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3BlobStore
// ────────────────────────────────────────────────────────────────────────────

/// S3 / MinIO bucket store.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    /// Constructs a client configured for MinIO (local) or AWS (production).
    pub async fn connect(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "carousel-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&settings.endpoint)
            .load()
            .await;

        info!(bucket = %settings.bucket, endpoint = %settings.endpoint, "S3 client initialized");
        Self {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: settings.bucket.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StoreError::S3 {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        debug!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let s3_err = |message: String| StoreError::S3 {
            key: key.to_string(),
            message,
        };

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(s3_err(e.to_string())),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| s3_err(e.to_string()))?;
        Ok(Some(data.into_bytes()))
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
