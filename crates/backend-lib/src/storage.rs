// ============================
// vidtube-backend/src/storage.rs
// ============================
//! Credential store abstraction.
//!
//! One record per principal, holding the salted password hash and at most one
//! live refresh token. The session manager and the authorization gate only
//! talk to the store through [`CredentialStore`].
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use vidtube_common::PrincipalView;

mod flat_file;
mod memory;

pub use flat_file::FlatFileCredentialStore;
pub use memory::InMemoryCredentialStore;

/// Opaque, immutable principal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique identity key already held by another principal
    #[error("{0} already taken")]
    Duplicate(&'static str),

    #[error("principal not found")]
    NotFound,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Data needed to create a principal
#[derive(Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// Stored principal, including the secrets that never leave the library
#[derive(Clone, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: PrincipalId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrincipalRecord {
    /// Identity keys are matched case-insensitively.
    pub fn matches_login(&self, login: &str) -> bool {
        let login = normalize_identity(login);
        self.username == login || self.email == login
    }

    pub fn view(&self) -> PrincipalView {
        PrincipalView {
            id: self.id.0,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar_url.clone(),
            cover_image: self.cover_image_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for PrincipalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrincipalRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish_non_exhaustive()
    }
}

/// Lowercase + trim, the stored form of usernames and emails
pub fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Trait for credential store backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a principal; username and email must both be unused
    async fn insert(&self, principal: NewPrincipal) -> Result<PrincipalRecord, StoreError>;

    /// Look a principal up by username OR email
    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalRecord>, StoreError>;

    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<PrincipalRecord>, StoreError>;

    async fn set_password_hash(&self, id: &PrincipalId, hash: String) -> Result<(), StoreError>;

    /// Unconditionally overwrite (or clear, with `None`) the stored refresh token
    async fn replace_refresh_token(
        &self,
        id: &PrincipalId,
        token: Option<String>,
    ) -> Result<(), StoreError>;

    /// Atomically replace the stored refresh token if it equals `expected`.
    ///
    /// Returns `Ok(false)` without writing when the stored value differs or is absent.
    async fn compare_and_swap_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        replacement: Option<String>,
    ) -> Result<bool, StoreError>;

    async fn update_profile(
        &self,
        id: &PrincipalId,
        full_name: String,
        email: String,
    ) -> Result<PrincipalRecord, StoreError>;

    /// Returns the previous avatar URL, if any
    async fn set_avatar_url(
        &self,
        id: &PrincipalId,
        url: String,
    ) -> Result<Option<String>, StoreError>;

    /// Returns the previous cover image URL, if any
    async fn set_cover_image_url(
        &self,
        id: &PrincipalId,
        url: String,
    ) -> Result<Option<String>, StoreError>;
}
