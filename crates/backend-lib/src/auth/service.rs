use async_trait::async_trait;
use vidtube_common::PrincipalView;

use super::{AuthError, LoginOutcome, TokenPair};
use crate::storage::PrincipalId;

/// Credential and session lifecycle, independent of the HTTP transport
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<PrincipalView, AuthError>;

    async fn login(&self, login: &str, password: &str) -> Result<LoginOutcome, AuthError>;

    /// Redeem a refresh token for a new pair; the presented token is spent
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    async fn logout(&self, principal: &PrincipalId) -> Result<(), AuthError>;

    async fn change_password(
        &self,
        principal: &PrincipalId,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError>;
}
