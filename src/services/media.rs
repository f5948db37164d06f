use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported {field} type: {extension}")]
    UnsupportedType { field: &'static str, extension: String },

    #[error("{field} exceeds the {limit} byte upload limit")]
    TooLarge { field: &'static str, limit: usize },

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Media storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedType { field, .. } | MediaError::TooLarge { field, .. } => {
                ApiError::validation(field, err.to_string())
            }
            MediaError::InvalidPath(_) => ApiError::validation("media", err.to_string()),
            MediaError::Io(e) => {
                tracing::error!("Media storage failure: {}", e);
                ApiError::internal("Could not store uploaded media")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Multipart field the files arrive in
    pub fn field(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    fn allowed(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["jpg", "jpeg", "png", "webp"],
            MediaKind::Video => &["mp4", "webm"],
        }
    }

    /// Lower-cased extension of `file_name` if this kind accepts it
    pub fn accept(&self, file_name: &str) -> Result<String, MediaError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if self.allowed().contains(&extension.as_str()) {
            Ok(extension)
        } else {
            Err(MediaError::UnsupportedType { field: self.field(), extension })
        }
    }
}

/// Where venue media lives. Paths handed out are relative to the store.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, venue: Uuid, kind: MediaKind, file_name: &str, bytes: &[u8]) -> Result<String, MediaError>;

    async fn remove(&self, path: &str) -> Result<(), MediaError>;
}

/// Files under `<root>/venues/<venue id>/` with generated names
pub struct LocalMediaStore {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { root: root.into(), max_bytes }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);
        let plain = path.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain || relative.is_empty() {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, venue: Uuid, kind: MediaKind, file_name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let extension = kind.accept(file_name)?;
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge { field: kind.field(), limit: self.max_bytes });
        }

        let relative = format!("venues/{}/{}.{}", venue, Uuid::new_v4(), extension);
        let target = self.resolve(&relative)?;
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!("Stored {} ({} bytes)", relative, bytes.len());
        Ok(relative)
    }

    async fn remove(&self, path: &str) -> Result<(), MediaError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            // already gone is fine
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_checked_per_kind() {
        assert_eq!(MediaKind::Image.accept("Court.JPG").unwrap(), "jpg");
        assert!(MediaKind::Image.accept("clip.mp4").is_err());
        assert!(MediaKind::Video.accept("clip.webm").is_ok());
        assert!(MediaKind::Video.accept("noextension").is_err());
    }

    #[tokio::test]
    async fn stores_and_removes_under_the_venue_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path(), 1024);
        let venue = Uuid::new_v4();

        let path = store.store(venue, MediaKind::Image, "front.png", b"png-bytes").await.unwrap();
        assert!(path.starts_with(&format!("venues/{}/", venue)));
        assert!(path.ends_with(".png"));
        assert_eq!(tokio::fs::read(dir.path().join(&path)).await.unwrap(), b"png-bytes");

        store.remove(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());
        // removing twice is not an error
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_oversized_uploads_and_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path(), 4);

        let err = store.store(Uuid::new_v4(), MediaKind::Video, "a.mp4", b"too large").await.unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { field: "videos", .. }));

        let err = store.remove("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidPath(_)));
    }
}
