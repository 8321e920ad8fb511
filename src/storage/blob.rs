//! Object storage access for startup artifacts.
//!
//! Rules and climate snapshots live as JSON objects in a bucket. The
//! [`BlobStore`] trait hides where that bucket actually is:
//! - [`LocalFsBlobStore`]: `{root}/{bucket}/{object}` on disk
//! - [`HttpBlobStore`]: `GET {base_url}/{bucket}/{object}` (public GCS/S3-style URLs)
//! - [`InMemoryBlobStore`]: fixed contents for tests and local demos

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Blob access errors
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("object {bucket}/{object} not found")]
    NotFound { bucket: String, object: String },
    #[error("invalid object name '{0}'")]
    InvalidName(String),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage returned status {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },
}

/// Read-only access to a bucket of objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full contents of `bucket/object`.
    async fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>, BlobError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Characters that change the meaning of a URL path or are never valid in names.
const FORBIDDEN_NAME_CHARS: &[char] = &['?', '#', '%', '\\'];

/// Reject empty names, anything that would escape the bucket, and characters
/// that would turn a URL path segment into a query or fragment.
fn check_object_name(object: &str) -> Result<(), BlobError> {
    let escapes = Path::new(object)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    let forbidden = object
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c));
    if object.is_empty() || escapes || forbidden {
        return Err(BlobError::InvalidName(object.to_string()));
    }
    Ok(())
}

// ============================================================================
// Local filesystem
// ============================================================================

pub struct LocalFsBlobStore {
    root: PathBuf,
}

impl LocalFsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalFsBlobStore {
    async fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>, BlobError> {
        check_object_name(bucket)?;
        check_object_name(object)?;
        let path = self.root.join(bucket).join(object);
        debug!(path = %path.display(), "Reading blob from local filesystem");
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            Err(source) => Err(BlobError::Io { path, source }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "localfs"
    }
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BlobError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, object)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>, BlobError> {
        check_object_name(bucket)?;
        check_object_name(object)?;
        let url = self.object_url(bucket, object);
        debug!(url = %url, "Fetching blob over HTTP");

        let resp = self.http.get(&url).send().await?;
        match resp.status() {
            reqwest::StatusCode::OK => Ok(resp.bytes().await?.to_vec()),
            reqwest::StatusCode::NOT_FOUND => Err(BlobError::NotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            status => Err(BlobError::Status { status, url }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Fixed set of objects. Not durable.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_object(mut self, bucket: &str, object: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.objects
            .insert((bucket.to_string(), object.to_string()), contents.into());
        self
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>, BlobError> {
        self.objects
            .get(&(bucket.to_string(), object.to_string()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
