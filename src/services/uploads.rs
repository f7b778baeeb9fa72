//! Image upload storage.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::UploadConfig;
use crate::pipeline::UploadedFile;

const IMAGE_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only image files are allowed")]
    NotAnImage,
    #[error("File too large (limit {limit} bytes)")]
    TooLarge { limit: usize },
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client is at fault (400) rather than the server.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

/// A file written to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUpload {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_file_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and store an image under a fresh unique name.
    pub async fn save_image(&self, file: &UploadedFile) -> Result<StoredUpload, UploadError> {
        let extension = image_extension(file).ok_or(UploadError::NotAnImage)?;
        if file.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            fastrand::u32(..1_000_000_000),
            extension
        );
        tokio::fs::write(self.dir.join(&filename), &file.bytes).await?;
        tracing::info!(%filename, bytes = file.bytes.len(), "Stored upload");

        Ok(StoredUpload {
            url: format!("{}/{}", self.url_prefix, filename),
            filename,
        })
    }
}

/// Lower-cased extension of an acceptable image. Both the MIME type and the
/// file name must name an image type.
fn image_extension(file: &UploadedFile) -> Option<String> {
    let mime = file.content_type.as_deref()?.to_ascii_lowercase();
    let subtype = mime.strip_prefix("image/")?;
    if !IMAGE_TYPES.contains(&subtype) {
        return None;
    }
    let name = file.file_name.as_deref()?;
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    IMAGE_TYPES.contains(&extension.as_str()).then_some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn upload(name: &str, mime: &str, size: usize) -> UploadedFile {
        UploadedFile {
            field: "image".into(),
            file_name: Some(name.into()),
            content_type: Some(mime.into()),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    fn store(dir: &Path, max: usize) -> UploadStore {
        UploadStore::new(&UploadConfig {
            dir: dir.to_path_buf(),
            url_prefix: "/uploads".into(),
            max_file_bytes: max,
        })
    }

    #[tokio::test]
    async fn test_saves_image() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path(), 1024);
        let stored = uploads.save_image(&upload("Cat.PNG", "image/png", 10)).await.unwrap();
        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.url, format!("/uploads/{}", stored.filename));
        assert!(dir.path().join(&stored.filename).exists());
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path(), 1024);
        for file in [
            upload("notes.txt", "text/plain", 10),
            upload("cat.png", "text/plain", 10),
            upload("cat.exe", "image/png", 10),
            upload("cat.svg", "image/svg+xml", 10),
        ] {
            let err = uploads.save_image(&file).await.unwrap_err();
            assert!(matches!(err, UploadError::NotAnImage));
            assert_eq!(err.to_string(), "Only image files are allowed");
        }
    }

    #[tokio::test]
    async fn test_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path(), 8);
        let err = uploads.save_image(&upload("a.gif", "image/gif", 9)).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { limit: 8 }));
        assert!(err.is_rejection());
    }
}
