// ============================
// vidtube-backend/src/lib.rs
// ============================
//! Core library for the vidtube session service: credential storage,
//! token issuance and rotation, request authorization and the HTTP surface.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod profile;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthService, AuthorizationGate, SessionManager, TokenCodec};
use crate::config::Settings;
use crate::error::AppError;
use crate::media::MediaStore;
use crate::profile::ProfileService;
use crate::storage::CredentialStore;

pub use router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Session manager, also backing `auth`
    pub sessions: Arc<SessionManager>,
    /// Access-token gate for protected routes
    pub gate: Arc<AuthorizationGate>,
    /// Profile reads and avatar/cover image updates
    pub profiles: Arc<ProfileService>,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire every service over the given stores
    pub fn new(
        store: Arc<dyn CredentialStore>,
        media: Arc<dyn MediaStore>,
        config: &Settings,
    ) -> Result<Self, AppError> {
        let codec = Arc::new(TokenCodec::from_settings(&config.tokens));
        let sessions = Arc::new(SessionManager::from_settings(
            store.clone(),
            codec.clone(),
            config,
        )?);
        let auth: Arc<dyn AuthService> = sessions.clone();
        let gate = Arc::new(AuthorizationGate::new(store.clone(), codec));
        let profiles = Arc::new(ProfileService::new(store, media));

        Ok(Self {
            auth,
            sessions,
            gate,
            profiles,
            settings: Arc::new(config.clone()),
        })
    }
}
