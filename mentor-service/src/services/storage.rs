//! Image blob storage.
//!
//! Messages and profiles reference images by an opaque id; the store
//! resolves those references to signed, expiring download URLs. The
//! local-disk implementation is the default; the trait is the seam for
//! an object-store backend.

use crate::config::ImageStoreConfig;
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use service_core::utils::signature;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

/// Resolves opaque image references to fetchable URLs.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// A signed URL for the image, or None when the blob is missing.
    async fn resolve_url(&self, image_id: &str) -> Result<Option<String>, AppError>;
}

pub struct LocalImageStore {
    base_path: PathBuf,
    public_base_url: String,
    signing_secret: String,
    url_ttl_seconds: i64,
}

impl LocalImageStore {
    pub async fn new(config: &ImageStoreConfig) -> Result<Self, AppError> {
        let base_path = PathBuf::from(&config.local_path);
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }

        Ok(Self {
            base_path,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            signing_secret: config.signing_secret.clone(),
            url_ttl_seconds: config.url_ttl_seconds,
        })
    }

    /// Store an uploaded blob; the returned id carries the extension so
    /// downloads can be served with the right content type.
    pub async fn save(&self, data: Vec<u8>, extension: &str) -> Result<String, AppError> {
        let image_id = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.base_path.join(&image_id), data).await?;
        Ok(image_id)
    }

    pub async fn open(&self, image_id: &str) -> Result<Vec<u8>, AppError> {
        validate_image_id(image_id)?;
        fs::read(self.base_path.join(image_id))
            .await
            .map_err(|_| AppError::NotFound(anyhow::anyhow!("Image not found")))
    }

    pub fn signing_secret(&self) -> &str {
        &self.signing_secret
    }

    /// Build a signed download URL valid for the configured TTL.
    pub fn signed_url(&self, image_id: &str) -> Result<String, AppError> {
        let expires = Utc::now().timestamp() + self.url_ttl_seconds;
        let sig = signature::generate_image_signature(image_id, expires, &self.signing_secret)
            .map_err(AppError::InternalError)?;

        Ok(format!(
            "{}/images/{}?expires={}&signature={}",
            self.public_base_url, image_id, expires, sig
        ))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn resolve_url(&self, image_id: &str) -> Result<Option<String>, AppError> {
        if validate_image_id(image_id).is_err() {
            return Ok(None);
        }
        if fs::metadata(self.base_path.join(image_id)).await.is_err() {
            return Ok(None);
        }
        Ok(Some(self.signed_url(image_id)?))
    }
}

/// Ids are `{uuid}.{ext}`; anything else (in particular path separators)
/// is rejected before touching the filesystem.
fn validate_image_id(image_id: &str) -> Result<(), AppError> {
    let valid = !image_id.is_empty()
        && !image_id.contains("..")
        && image_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid image reference"
        )))
    }
}

/// Content type for serving, by stored extension.
pub fn content_type_for(image_id: &str) -> &'static str {
    if image_id.ends_with(".png") {
        "image/png"
    } else if image_id.ends_with(".jpg") || image_id.ends_with(".jpeg") {
        "image/jpeg"
    } else if image_id.ends_with(".webp") {
        "image/webp"
    } else if image_id.ends_with(".gif") {
        "image/gif"
    } else {
        "application/octet-stream"
    }
}

/// Extension for an uploaded content type; unknown types fall back to a
/// generic binary extension.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
