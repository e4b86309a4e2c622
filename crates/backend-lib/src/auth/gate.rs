//! Per-request authorization check for protected operations.
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use metrics::counter;
use tracing::debug;
use vidtube_common::{PrincipalView, ACCESS_TOKEN_COOKIE};

use super::{AuthError, TokenCodec, TokenKind};
use crate::metrics as keys;
use crate::storage::CredentialStore;

/// Value of cookie `name`, if any `Cookie` header carries it
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|part| {
            let (k, v) = part.trim().split_once('=')?;
            (k == name).then(|| v.trim().to_string())
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    Some(token.to_string())
}

/// Candidate access token: `accessToken` cookie first, then a Bearer header.
/// Empty values count as absent.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_TOKEN_COOKIE)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers).filter(|t| !t.is_empty()))
}

/// Read-only gate: verifies an access token and resolves its principal
#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
}

impl AuthorizationGate {
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    pub async fn authorize(&self, token: Option<&str>) -> Result<PrincipalView, AuthError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(reject("missing token"));
        };

        let id = self.codec.verify(token, TokenKind::Access).map_err(|e| {
            debug!(error = %e, "access token rejected");
            reject("invalid token")
        })?;

        match self.store.find_by_id(&id).await {
            Ok(Some(record)) => Ok(record.view()),
            Ok(None) => Err(reject("unknown principal")),
            Err(e) => Err(e.into()),
        }
    }
}

fn reject(reason: &str) -> AuthError {
    debug!(reason, "request not authorized");
    counter!(keys::GATE_REJECTED).increment(1);
    AuthError::Unauthorized
}
