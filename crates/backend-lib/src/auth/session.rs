// ============================
// vidtube-backend/src/auth/session.rs
// ============================
//! Session lifecycle: login, refresh rotation, logout and password change.
//!
//! A principal holds at most one live refresh token. Login overwrites it,
//! logout clears it, and refresh swaps it atomically so a refresh token can be
//! redeemed at most once even when several requests race with the same token.
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, info, instrument, warn};
use vidtube_common::PrincipalView;
use zeroize::Zeroize;

use super::{
    password, AuthError, AuthService, PasswordHasher, PasswordRequirements, TokenCodec,
    TokenError, TokenKind, TokenPair,
};
use crate::config::Settings;
use crate::metrics as keys;
use crate::storage::{CredentialStore, NewPrincipal, PrincipalId, StoreError};
use crate::validation::{validate_email, validate_full_name, validate_username};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: PrincipalView,
    pub tokens: TokenPair,
}

/// Session manager backed by a [`CredentialStore`]
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    hasher: PasswordHasher,
    requirements: PasswordRequirements,
    revoke_on_password_change: bool,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        hasher: PasswordHasher,
        requirements: PasswordRequirements,
    ) -> Self {
        Self {
            store,
            codec,
            hasher,
            requirements,
            revoke_on_password_change: false,
        }
    }

    /// Build a manager from loaded settings
    pub fn from_settings(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        settings: &Settings,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(settings.passwords.scrypt_log_n)?;
        Ok(Self::new(store, codec, hasher, settings.passwords.requirements())
            .with_revoke_on_password_change(settings.sessions.revoke_on_password_change))
    }

    /// Clear the refresh token whenever a password changes
    pub fn with_revoke_on_password_change(mut self, revoke: bool) -> Self {
        self.revoke_on_password_change = revoke;
        self
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn requirements(&self) -> &PasswordRequirements {
        &self.requirements
    }

    /// scrypt is deliberately slow, keep it off the async workers
    async fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        let hasher = self.hasher;
        let mut plain = plain.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_secure(&mut plain))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn check_password(&self, hash: String, plain: &str) -> Result<bool, AuthError> {
        let mut plain = plain.to_string();
        tokio::task::spawn_blocking(move || {
            let ok = password::verify_password(&hash, &plain);
            plain.zeroize();
            ok
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }

    fn issue_pair(&self, id: &PrincipalId) -> Result<TokenPair, AuthError> {
        self.codec
            .issue_pair(id)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn reject_refresh(reason: &str) -> AuthError {
        debug!(reason, "refresh rejected");
        counter!(keys::REFRESH_REJECTED).increment(1);
        AuthError::InvalidRefreshToken
    }
}

#[async_trait]
impl AuthService for SessionManager {
    #[instrument(skip(self, password, full_name))]
    async fn register(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<PrincipalView, AuthError> {
        let username = validate_username(username)?;
        let email = validate_email(email)?;
        let full_name = validate_full_name(full_name)?;
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }
        if !password::validate_password_strength(password, &self.requirements) {
            return Err(AuthError::Validation(self.requirements.describe()));
        }

        // Cheap pre-check so a taken name does not cost a hash
        if self.store.find_by_login(username).await?.is_some() {
            return Err(StoreError::Duplicate("username").into());
        }

        let password_hash = self.hash_password(password).await?;
        let record = self
            .store
            .insert(NewPrincipal {
                username: username.to_string(),
                email: email.to_string(),
                full_name: full_name.to_string(),
                password_hash,
            })
            .await?;

        info!(principal = %record.id, "principal registered");
        Ok(record.view())
    }

    #[instrument(skip(self, password))]
    async fn login(&self, login: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let login = login.trim();
        if login.is_empty() {
            return Err(AuthError::Validation(
                "username or email is required".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let Some(record) = self.store.find_by_login(login).await? else {
            counter!(keys::LOGIN_FAILED).increment(1);
            return Err(AuthError::NotFound);
        };

        if !self.check_password(record.password_hash.clone(), password).await? {
            warn!(principal = %record.id, "login with wrong password");
            counter!(keys::LOGIN_FAILED).increment(1);
            return Err(AuthError::Unauthorized);
        }

        let tokens = self.issue_pair(&record.id)?;
        // Any earlier session's refresh token stops working here
        self.store
            .replace_refresh_token(&record.id, Some(tokens.refresh.token.clone()))
            .await?;

        counter!(keys::LOGIN_SUCCEEDED).increment(1);
        info!(principal = %record.id, "login succeeded");
        Ok(LoginOutcome {
            principal: record.view(),
            tokens,
        })
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(Self::reject_refresh("missing"));
        }

        let id = match self.codec.verify(refresh_token, TokenKind::Refresh) {
            Ok(id) => id,
            Err(TokenError::Expired) => return Err(Self::reject_refresh("expired")),
            Err(TokenError::InvalidSignature) => return Err(Self::reject_refresh("signature")),
            Err(_) => return Err(Self::reject_refresh("malformed")),
        };

        if self.store.find_by_id(&id).await?.is_none() {
            return Err(Self::reject_refresh("unknown principal"));
        }

        let tokens = self.issue_pair(&id)?;
        let swapped = match self
            .store
            .compare_and_swap_refresh_token(&id, refresh_token, Some(tokens.refresh.token.clone()))
            .await
        {
            Ok(swapped) => swapped,
            Err(StoreError::NotFound) => false,
            Err(e) => return Err(e.into()),
        };
        if !swapped {
            return Err(Self::reject_refresh("not the stored token"));
        }

        counter!(keys::REFRESH_SUCCEEDED).increment(1);
        debug!(principal = %id, "refresh token rotated");
        Ok(tokens)
    }

    #[instrument(skip(self))]
    async fn logout(&self, principal: &PrincipalId) -> Result<(), AuthError> {
        self.store.replace_refresh_token(principal, None).await?;
        counter!(keys::LOGOUT).increment(1);
        info!(principal = %principal, "logged out");
        Ok(())
    }

    #[instrument(skip(self, old_password, new_password, confirm_password))]
    async fn change_password(
        &self,
        principal: &PrincipalId,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        if old_password.is_empty() || new_password.is_empty() || confirm_password.is_empty() {
            return Err(AuthError::Validation(
                "old, new and confirmation passwords are required".to_string(),
            ));
        }
        if new_password != confirm_password {
            return Err(AuthError::Validation(
                "new password and confirmation do not match".to_string(),
            ));
        }
        if !password::validate_password_strength(new_password, &self.requirements) {
            return Err(AuthError::Validation(self.requirements.describe()));
        }

        let record = self
            .store
            .find_by_id(principal)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.check_password(record.password_hash, old_password).await? {
            warn!(principal = %principal, "password change with wrong old password");
            return Err(AuthError::Unauthorized);
        }

        let hash = self.hash_password(new_password).await?;
        self.store.set_password_hash(principal, hash).await?;

        if self.revoke_on_password_change {
            self.store.replace_refresh_token(principal, None).await?;
        }

        counter!(keys::PASSWORD_CHANGED).increment(1);
        info!(principal = %principal, revoked = self.revoke_on_password_change, "password changed");
        Ok(())
    }
}
