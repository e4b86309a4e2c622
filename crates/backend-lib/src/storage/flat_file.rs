//! Flat-file credential store.
//!
//! Records live in memory and are written to `<root>/principals.json` after
//! every successful mutation, so principals survive server restarts.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::{fs as tokio_fs, sync::Mutex};
use tracing::{debug, info};

use super::{
    CredentialStore, InMemoryCredentialStore, NewPrincipal, PrincipalId, PrincipalRecord,
    StoreError,
};

const PRINCIPALS_FILE: &str = "principals.json";

#[derive(Clone)]
pub struct FlatFileCredentialStore {
    inner: InMemoryCredentialStore,
    root: PathBuf,
    /// Serializes snapshot writes; the snapshot is taken while holding it
    persist_lock: Arc<Mutex<()>>,
}

impl FlatFileCredentialStore {
    /// Open (or create) a store rooted at `root`
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root).await.map_err(backend)?;

        let path = root.join(PRINCIPALS_FILE);
        let inner = match tokio_fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<PrincipalRecord> =
                    serde_json::from_slice(&bytes).map_err(backend)?;
                info!(count = records.len(), path = %path.display(), "loaded principals");
                InMemoryCredentialStore::from_records(records)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => InMemoryCredentialStore::new(),
            Err(e) => return Err(backend(e)),
        };

        Ok(Self {
            inner,
            root,
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(PRINCIPALS_FILE)
    }

    /// Write the current state to disk via a temp file + rename
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        let records = self.inner.snapshot().await;
        let json = serde_json::to_vec_pretty(&records).map_err(backend)?;

        let tmp = self.root.join(format!("{PRINCIPALS_FILE}.tmp"));
        tokio_fs::write(&tmp, &json).await.map_err(backend)?;
        tokio_fs::rename(&tmp, self.path()).await.map_err(backend)?;

        debug!(count = records.len(), "persisted principals");
        Ok(())
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl CredentialStore for FlatFileCredentialStore {
    async fn insert(&self, principal: NewPrincipal) -> Result<PrincipalRecord, StoreError> {
        let record = self.inner.insert(principal).await?;
        self.persist().await?;
        Ok(record)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalRecord>, StoreError> {
        self.inner.find_by_login(login).await
    }

    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<PrincipalRecord>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn set_password_hash(&self, id: &PrincipalId, hash: String) -> Result<(), StoreError> {
        self.inner.set_password_hash(id, hash).await?;
        self.persist().await
    }

    async fn replace_refresh_token(
        &self,
        id: &PrincipalId,
        token: Option<String>,
    ) -> Result<(), StoreError> {
        self.inner.replace_refresh_token(id, token).await?;
        self.persist().await
    }

    async fn compare_and_swap_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        replacement: Option<String>,
    ) -> Result<bool, StoreError> {
        let swapped = self
            .inner
            .compare_and_swap_refresh_token(id, expected, replacement)
            .await?;
        if swapped {
            self.persist().await?;
        }
        Ok(swapped)
    }

    async fn update_profile(
        &self,
        id: &PrincipalId,
        full_name: String,
        email: String,
    ) -> Result<PrincipalRecord, StoreError> {
        let record = self.inner.update_profile(id, full_name, email).await?;
        self.persist().await?;
        Ok(record)
    }

    async fn set_avatar_url(
        &self,
        id: &PrincipalId,
        url: String,
    ) -> Result<Option<String>, StoreError> {
        let previous = self.inner.set_avatar_url(id, url).await?;
        self.persist().await?;
        Ok(previous)
    }

    async fn set_cover_image_url(
        &self,
        id: &PrincipalId,
        url: String,
    ) -> Result<Option<String>, StoreError> {
        let previous = self.inner.set_cover_image_url(id, url).await?;
        self.persist().await?;
        Ok(previous)
    }
}
