use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::ApiError;

/// Where an upload lands and how its stored name is prefixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    IdCard,
    Supporting,
    Photo,
    Poster,
}

impl FileKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            FileKind::IdCard => "id-card",
            FileKind::Supporting => "supporting",
            FileKind::Photo => "photo",
            FileKind::Poster => "poster",
        }
    }

    pub fn subdir(&self) -> &'static str {
        match self {
            FileKind::IdCard => "id_cards",
            FileKind::Supporting => "supporting",
            FileKind::Photo => "photos",
            FileKind::Poster => "posters",
        }
    }
}

/// A file received from a multipart request, not yet validated or stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub content_type: String,
    pub body: Bytes,
}

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];
const ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "application/pdf"];

/// Reject anything that is not an image or PDF within the size cap. Checks
/// both the extension and the declared content type, like the original
/// intake filter.
pub fn validate_upload(upload: &Upload, max_bytes: u64) -> Result<(), ApiError> {
    if upload.body.len() as u64 > max_bytes {
        return Err(ApiError::FileTooLarge(max_bytes / (1024 * 1024)));
    }
    let ext = extension(&upload.original_name).ok_or(ApiError::UnsupportedFile)?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str())
        || !ALLOWED_CONTENT_TYPES.contains(&upload.content_type.as_str())
    {
        return Err(ApiError::UnsupportedFile);
    }
    Ok(())
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// `{prefix}-{millis}-{nonce}.{ext}`, unique enough to never collide on
/// disk and traceable back to its intake field.
pub fn generate_filename(kind: FileKind, original_name: &str) -> String {
    let ext = extension(original_name).unwrap_or_else(|| "bin".into());
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let nonce: u32 = rand::thread_rng().gen();
    format!("{}-{}-{}.{}", kind.prefix(), millis, nonce, ext)
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist an already-validated upload, returning the stored filename
    /// recorded on the owning record.
    async fn save(&self, kind: FileKind, original_name: &str, body: Bytes)
        -> anyhow::Result<String>;
}

/// Uploads live on local disk under one root with a subdirectory per kind.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for DiskStore {
    async fn save(
        &self,
        kind: FileKind,
        original_name: &str,
        body: Bytes,
    ) -> anyhow::Result<String> {
        let filename = generate_filename(kind, original_name);
        let dir = self.root.join(kind.subdir());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        let path = dir.join(&filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;
        debug!(path = %path.display(), "upload stored");
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, len: usize) -> Upload {
        Upload {
            original_name: name.into(),
            content_type: content_type.into(),
            body: Bytes::from(vec![0u8; len]),
        }
    }

    const CAP: u64 = 5 * 1024 * 1024;

    #[test]
    fn accepts_images_and_pdf() {
        assert!(validate_upload(&upload("card.jpg", "image/jpeg", 100), CAP).is_ok());
        assert!(validate_upload(&upload("card.JPEG", "image/jpeg", 100), CAP).is_ok());
        assert!(validate_upload(&upload("photo.png", "image/png", 100), CAP).is_ok());
        assert!(validate_upload(&upload("letter.pdf", "application/pdf", 100), CAP).is_ok());
    }

    #[test]
    fn rejects_other_formats() {
        let err = validate_upload(&upload("movie.gif", "image/gif", 100), CAP).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFile));
        // extension and declared type must both pass
        let err = validate_upload(&upload("script.pdf", "text/x-sh", 100), CAP).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFile));
        let err = validate_upload(&upload("noextension", "image/png", 100), CAP).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFile));
    }

    #[test]
    fn rejects_oversized_files() {
        let err =
            validate_upload(&upload("big.png", "image/png", CAP as usize + 1), CAP).unwrap_err();
        assert!(matches!(err, ApiError::FileTooLarge(5)));
        assert!(validate_upload(&upload("ok.png", "image/png", CAP as usize), CAP).is_ok());
    }

    #[test]
    fn generated_names_keep_prefix_and_extension() {
        let name = generate_filename(FileKind::IdCard, "My Card.PDF");
        assert!(name.starts_with("id-card-"));
        assert!(name.ends_with(".pdf"));
        let other = generate_filename(FileKind::IdCard, "My Card.PDF");
        assert_ne!(name, other);
    }

    #[tokio::test]
    async fn disk_store_writes_under_kind_subdir() {
        let root = std::env::temp_dir().join(format!("memberd-test-{}", uuid::Uuid::new_v4()));
        let store = DiskStore::new(root.clone());
        let stored = store
            .save(FileKind::Photo, "face.png", Bytes::from_static(b"png-bytes"))
            .await
            .expect("save");
        let on_disk = tokio::fs::read(root.join("photos").join(&stored))
            .await
            .expect("read back");
        assert_eq!(on_disk, b"png-bytes");
        tokio::fs::remove_dir_all(root).await.ok();
    }
}
