//! Menu image uploads stored on local disk.
//!
//! DESIGN
//! ======
//! Files are accepted only when both the original file extension and the
//! declared MIME type name an allowed image format. Stored names are
//! `menu-<epoch millis>-<random 0..1e9><original extension>`, so client
//! supplied names never reach the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use super::epoch_millis;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "menuImage";

const ALLOWED_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No image file provided")]
    Missing,
    #[error("Only image files (JPEG, JPG, PNG, WebP) are allowed!")]
    UnsupportedType,
    #[error("File too large (limit {limit} bytes)")]
    TooLarge { limit: usize },
    #[error("Failed to upload image")]
    Storage(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub filename: String,
    pub path: PathBuf,
    pub size: usize,
    pub mimetype: String,
}

/// Extension of `file_name` including the dot, as given by the client.
fn extension(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}

/// True when both the extension and the MIME type name an allowed format.
#[must_use]
pub fn is_allowed_image(file_name: &str, content_type: &str) -> bool {
    let ext = extension(file_name).to_ascii_lowercase();
    let mime = content_type.to_ascii_lowercase();
    let allowed = |s: &str| ALLOWED_TYPES.iter().any(|t| s.contains(t));
    allowed(&ext) && allowed(&mime)
}

#[must_use]
pub fn stored_file_name(original: &str, millis: i64, suffix: u32) -> String {
    format!("menu-{millis}-{suffix}{}", extension(original))
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { dir: dir.into(), max_bytes }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if needed.
    ///
    /// # Errors
    ///
    /// Returns the filesystem error if the directory cannot be created.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Reject a file before its body is read.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::UnsupportedType`] for non-image files.
    pub fn check_type(&self, file_name: &str, content_type: &str) -> Result<(), UploadError> {
        if is_allowed_image(file_name, content_type) { Ok(()) } else { Err(UploadError::UnsupportedType) }
    }

    /// Validate and write one image under a generated name.
    ///
    /// # Errors
    ///
    /// Returns a type or size error for rejected files, and
    /// [`UploadError::Storage`] if the write fails.
    pub async fn save(&self, file_name: &str, content_type: &str, bytes: &[u8]) -> Result<StoredUpload, UploadError> {
        self.check_type(file_name, content_type)?;
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge { limit: self.max_bytes });
        }

        let filename = stored_file_name(file_name, epoch_millis(OffsetDateTime::now_utc()), rand::random_range(0..1_000_000_000));
        let path = self.dir.join(&filename);
        self.prepare().await.map_err(UploadError::Storage)?;
        tokio::fs::write(&path, bytes).await.map_err(UploadError::Storage)?;

        tracing::info!(%filename, size = bytes.len(), mimetype = content_type, "menu image stored");
        Ok(StoredUpload { filename, path, size: bytes.len(), mimetype: content_type.to_owned() })
    }
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
