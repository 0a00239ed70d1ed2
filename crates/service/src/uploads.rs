//! Object storage for uploaded logo images.
//!
//! The branding service only ever sees the reference string a store returns;
//! where the bytes live is up to the implementation.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::metrics;

/// Largest accepted image unless configured otherwise (10 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/svg+xml", "image/gif"];

/// An image payload as received from the client.
#[derive(Debug, Clone)]
pub struct LogoUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Allow-listed media types and a size ceiling.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
    max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(), DEFAULT_MAX_BYTES)
    }
}

impl UploadPolicy {
    pub fn new(allowed_types: Vec<String>, max_bytes: u64) -> Self {
        let allowed_types = allowed_types.into_iter().map(|t| t.trim().to_ascii_lowercase()).collect();
        Self { allowed_types, max_bytes }
    }

    pub fn validate(&self, upload: &LogoUpload) -> Result<(), ServiceError> {
        let media_type = essence(&upload.content_type);
        if !self.allowed_types.iter().any(|t| *t == media_type) {
            return Err(ServiceError::UnsupportedMediaType(upload.content_type.clone()));
        }
        if upload.bytes.is_empty() {
            return Err(ServiceError::Validation("no file uploaded".into()));
        }
        if upload.bytes.len() as u64 > self.max_bytes {
            return Err(ServiceError::PayloadTooLarge { limit: self.max_bytes });
        }
        Ok(())
    }
}

/// Media type without parameters, lower-cased (`image/PNG; q=1` -> `image/png`).
fn essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// File extension for a stored image. Known media types map to a fixed
/// extension; anything else falls back to a short alphanumeric extension of
/// the client file name, or `bin`.
fn extension_for(content_type: &str, file_name: Option<&str>) -> String {
    match essence(content_type).as_str() {
        "image/jpeg" => return "jpg".into(),
        "image/png" => return "png".into(),
        "image/svg+xml" => return "svg".into(),
        "image/gif" => return "gif".into(),
        "image/webp" => return "webp".into(),
        _ => {}
    }
    file_name
        .and_then(|n| n.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".into())
}

/// Trait abstraction for logo image storage.
/// Implementations can be local disk, a bucket, or a CDN.
#[async_trait]
pub trait LogoStorage: Send + Sync {
    /// Persist the image and return the reference to place in `logoUrl`.
    async fn store(&self, upload: LogoUpload) -> Result<String, ServiceError>;
}

/// Writes images as `<uuid>.<ext>` into a directory served under `public_prefix`.
pub struct LocalLogoStorage {
    dir: PathBuf,
    public_prefix: String,
    policy: UploadPolicy,
}

impl LocalLogoStorage {
    pub async fn new<P: Into<PathBuf>>(dir: P, public_prefix: &str, policy: UploadPolicy) -> Result<Arc<Self>, ServiceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(ServiceError::storage)?;
        let public_prefix = public_prefix.trim_end_matches('/').to_string();
        Ok(Arc::new(Self { dir, public_prefix, policy }))
    }
}

#[async_trait]
impl LogoStorage for LocalLogoStorage {
    async fn store(&self, upload: LogoUpload) -> Result<String, ServiceError> {
        self.policy.validate(&upload)?;
        let ext = extension_for(&upload.content_type, upload.file_name.as_deref());
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&file_name);
        fs::write(&path, &upload.bytes).await.map_err(ServiceError::storage)?;

        metrics::UPLOADS_TOTAL.inc();
        info!(file = %file_name, bytes = upload.bytes.len(), content_type = %upload.content_type, "logo_stored");
        Ok(format!("{}/{}", self.public_prefix, file_name))
    }
}
