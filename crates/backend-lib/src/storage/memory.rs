//! In-memory credential store.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    normalize_identity, CredentialStore, NewPrincipal, PrincipalId, PrincipalRecord, StoreError,
};

/// Credential store kept in process memory.
///
/// Every read-compare-write runs under a single write guard, so refresh-token
/// rotation is atomic with respect to other writers.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    principals: Arc<RwLock<HashMap<PrincipalId, PrincipalRecord>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records
    pub fn from_records(records: impl IntoIterator<Item = PrincipalRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            principals: Arc::new(RwLock::new(map)),
        }
    }

    /// Copy of every record, ordered by creation time
    pub async fn snapshot(&self) -> Vec<PrincipalRecord> {
        let principals = self.principals.read().await;
        let mut records: Vec<_> = principals.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub async fn len(&self) -> usize {
        self.principals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.principals.read().await.is_empty()
    }

    async fn with_record<T>(
        &self,
        id: &PrincipalId,
        f: impl FnOnce(&mut PrincipalRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut principals = self.principals.write().await;
        let record = principals.get_mut(id).ok_or(StoreError::NotFound)?;
        Ok(f(record))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, principal: NewPrincipal) -> Result<PrincipalRecord, StoreError> {
        let username = normalize_identity(&principal.username);
        let email = normalize_identity(&principal.email);

        let mut principals = self.principals.write().await;
        if principals.values().any(|r| r.username == username) {
            return Err(StoreError::Duplicate("username"));
        }
        if principals.values().any(|r| r.email == email) {
            return Err(StoreError::Duplicate("email"));
        }

        let now = Utc::now();
        let record = PrincipalRecord {
            id: PrincipalId::new(),
            username,
            email,
            full_name: principal.full_name.trim().to_string(),
            password_hash: principal.password_hash,
            refresh_token: None,
            avatar_url: None,
            cover_image_url: None,
            created_at: now,
            updated_at: now,
        };
        principals.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalRecord>, StoreError> {
        let principals = self.principals.read().await;
        Ok(principals.values().find(|r| r.matches_login(login)).cloned())
    }

    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<PrincipalRecord>, StoreError> {
        Ok(self.principals.read().await.get(id).cloned())
    }

    async fn set_password_hash(&self, id: &PrincipalId, hash: String) -> Result<(), StoreError> {
        self.with_record(id, |r| {
            r.password_hash = hash;
            r.updated_at = Utc::now();
        })
        .await
    }

    async fn replace_refresh_token(
        &self,
        id: &PrincipalId,
        token: Option<String>,
    ) -> Result<(), StoreError> {
        self.with_record(id, |r| r.refresh_token = token).await
    }

    async fn compare_and_swap_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        replacement: Option<String>,
    ) -> Result<bool, StoreError> {
        self.with_record(id, |r| match r.refresh_token.as_deref() {
            Some(current) if current.as_bytes() == expected.as_bytes() => {
                r.refresh_token = replacement;
                true
            },
            _ => false,
        })
        .await
    }

    async fn update_profile(
        &self,
        id: &PrincipalId,
        full_name: String,
        email: String,
    ) -> Result<PrincipalRecord, StoreError> {
        let email = normalize_identity(&email);

        let mut principals = self.principals.write().await;
        if principals
            .values()
            .any(|r| r.email == email && r.id != *id)
        {
            return Err(StoreError::Duplicate("email"));
        }
        let record = principals.get_mut(id).ok_or(StoreError::NotFound)?;
        record.full_name = full_name.trim().to_string();
        record.email = email;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn set_avatar_url(
        &self,
        id: &PrincipalId,
        url: String,
    ) -> Result<Option<String>, StoreError> {
        self.with_record(id, |r| {
            r.updated_at = Utc::now();
            r.avatar_url.replace(url)
        })
        .await
    }

    async fn set_cover_image_url(
        &self,
        id: &PrincipalId,
        url: String,
    ) -> Result<Option<String>, StoreError> {
        self.with_record(id, |r| {
            r.updated_at = Utc::now();
            r.cover_image_url.replace(url)
        })
        .await
    }
}
