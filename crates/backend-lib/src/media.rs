//! Media object storage for avatars and cover images.
//!
//! Objects are addressed by a random public id. The stored URL is
//! `<public base url>/<public id>.<ext>`, and deletion recovers the public id
//! from the last path segment of that URL.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tokio::fs as tokio_fs;
use tracing::{debug, info};

use crate::auth::AuthError;

/// Random bytes behind a public id (128 bits)
const PUBLIC_ID_BYTES: usize = 16;
const MAX_EXTENSION_LEN: usize = 10;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media object is empty")]
    Empty,

    #[error("cannot derive a media id from url: {0}")]
    InvalidUrl(String),

    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for AuthError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Empty => AuthError::Validation("media file is empty".to_string()),
            other => AuthError::Upstream(other.to_string()),
        }
    }
}

/// A file received from a client
#[derive(Debug, Clone, Default)]
pub struct MediaUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension from the client file name, else from the content type
    fn extension(&self) -> String {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LEN
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(str::to_ascii_lowercase);

        from_name.unwrap_or_else(|| {
            match self.content_type.as_deref() {
                Some("image/png") => "png",
                Some("image/jpeg") => "jpg",
                Some("image/gif") => "gif",
                Some("image/webp") => "webp",
                _ => "bin",
            }
            .to_string()
        })
    }
}

/// A stored media object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    pub public_id: String,
    pub url: String,
}

/// Trait for media storage backends
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, upload: MediaUpload) -> Result<MediaObject, MediaError>;

    /// Remove the object behind `url`. Unknown objects are not an error.
    async fn delete(&self, url: &str) -> Result<(), MediaError>;
}

/// Public id of the object a media URL points at: the last path segment,
/// without query string or extension.
pub fn public_id_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let last = path.rsplit('/').next()?;
    let id = last.split('.').next()?;
    (!id.is_empty()).then_some(id)
}

/// Fresh URL-safe public id
pub fn generate_public_id() -> String {
    let mut buffer = [0u8; PUBLIC_ID_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

fn is_public_id(id: &str) -> bool {
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Media store writing objects into a local directory
#[derive(Debug, Clone)]
pub struct FlatFileMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl FlatFileMediaStore {
    pub async fn open<P: AsRef<Path>>(root: P, public_base_url: &str) -> Result<Self, MediaError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStore for FlatFileMediaStore {
    async fn upload(&self, upload: MediaUpload) -> Result<MediaObject, MediaError> {
        if upload.is_empty() {
            return Err(MediaError::Empty);
        }

        let public_id = generate_public_id();
        let file_name = format!("{public_id}.{}", upload.extension());
        tokio_fs::write(self.root.join(&file_name), &upload.bytes).await?;

        info!(public_id = %public_id, size = upload.bytes.len(), "media stored");
        Ok(MediaObject {
            url: format!("{}/{file_name}", self.public_base_url),
            public_id,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let public_id = public_id_from_url(url)
            .filter(|id| is_public_id(id))
            .ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?;

        let mut entries = tokio_fs::read_dir(&self.root).await?;
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(public_id) {
                tokio_fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        debug!(public_id, removed, "media deleted");
        Ok(())
    }
}
