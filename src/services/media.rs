//! Media storage for base64-encoded images
//!
//! Clients send images inline as `data:image/<ext>;base64,<payload>`. The
//! payload is decoded, checked against the media limits and written under
//! `<root>/<folder>/<uuid>.<ext>`. The database keeps the path relative to
//! the media root; [`MediaStorage::url`] turns it into an absolute URL.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use data_encoding::BASE64;
use tokio::fs;
use uuid::Uuid;

use crate::config::MediaConfig;

/// Folder for recipe images
pub const RECIPES_FOLDER: &str = "recipes";
/// Folder for user avatars
pub const AVATARS_FOLDER: &str = "avatars";

/// Error types for media operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The value is not a base64 image data URI
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The image type is not accepted
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    /// The decoded image exceeds the size limit
    #[error("Image too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// Filesystem failure
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Lowercased extension from the MIME subtype
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Parse and decode a `data:image/<ext>;base64,<payload>` string
pub fn decode_data_uri(value: &str) -> Result<DecodedImage, MediaError> {
    let rest = value
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| MediaError::InvalidImage("expected a data:image/ URI".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::InvalidImage("missing payload".to_string()))?;

    let extension = header
        .strip_suffix(";base64")
        .ok_or_else(|| MediaError::InvalidImage("payload is not base64".to_string()))?
        .to_ascii_lowercase();

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MediaError::InvalidImage(format!(
            "bad image type '{}'",
            extension
        )));
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| MediaError::InvalidImage(format!("bad base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(MediaError::InvalidImage("empty image".to_string()));
    }

    Ok(DecodedImage { extension, bytes })
}

/// Image store rooted at the configured media directory
#[derive(Debug, Clone)]
pub struct MediaStorage {
    config: MediaConfig,
    base_url: String,
}

impl MediaStorage {
    /// `site_url` is the public origin used for absolute URLs
    pub fn new(config: MediaConfig, site_url: &str) -> Self {
        let mut config = config;
        if !config.url_prefix.starts_with('/') {
            config.url_prefix.insert(0, '/');
        }
        if !config.url_prefix.ends_with('/') {
            config.url_prefix.push('/');
        }
        Self {
            config,
            base_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// URL path prefix media is served under, e.g. `/media/`
    pub fn url_prefix(&self) -> &str {
        &self.config.url_prefix
    }

    /// Absolute URL for a stored relative path
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}{}", self.base_url, self.config.url_prefix, relative)
    }

    /// Decode and store an image, returning its path relative to the root
    pub async fn save_data_uri(&self, folder: &str, data_uri: &str) -> Result<String, MediaError> {
        let image = decode_data_uri(data_uri)?;

        if !self.config.is_extension_allowed(&image.extension) {
            return Err(MediaError::UnsupportedType(image.extension));
        }

        let size = image.bytes.len() as u64;
        if size > self.config.max_file_size {
            return Err(MediaError::TooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        let dir = self.config.root.join(folder);
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);
        fs::write(dir.join(&file_name), &image.bytes).await?;

        let relative = format!("{}/{}", folder, file_name);
        tracing::debug!("Stored image {} ({} bytes)", relative, size);
        Ok(relative)
    }

    /// Remove a stored file. A missing file is not an error.
    pub async fn delete(&self, relative: &str) -> Result<(), MediaError> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort delete used when cleaning up replaced or orphaned files
    pub async fn discard(&self, relative: &str) {
        if let Err(e) = self.delete(relative).await {
            tracing::warn!("Failed to remove media file {}: {}", relative, e);
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let rel = Path::new(relative);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(MediaError::InvalidImage(format!(
                "path escapes media root: {}",
                relative
            )));
        }
        Ok(self.config.root.join(rel))
    }
}
