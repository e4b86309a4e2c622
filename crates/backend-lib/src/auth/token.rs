//! Signed access/refresh tokens.
//!
//! Both kinds are HS256 JWTs carrying `{sub, iat, exp, jti, typ}`. Each kind
//! has its own secret and lifetime, so an access token can never verify as a
//! refresh token or the other way around. The codec holds no mutable state and
//! is safe to share between any number of concurrent requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TokenSettings;
use crate::storage::PrincipalId;

/// Which of the two token kinds a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens minted in the same second still differ
    pub jti: String,
    pub typ: TokenKind,
}

/// Detailed verification failure. Only ever logged; callers see one class.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// A freshly minted token and when it stops being valid
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access + refresh pair handed to a client on login and refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl KindKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }
}

pub struct TokenCodec {
    access: KindKeys,
    refresh: KindKeys,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(
        access_secret: &[u8],
        access_ttl: Duration,
        refresh_secret: &[u8],
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access: KindKeys::new(access_secret, access_ttl),
            refresh: KindKeys::new(refresh_secret, refresh_ttl),
            validation,
        }
    }

    pub fn from_settings(settings: &TokenSettings) -> Self {
        Self::new(
            settings.access_secret.as_bytes(),
            settings.access_ttl(),
            settings.refresh_secret.as_bytes(),
            settings.refresh_ttl(),
        )
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of tokens of `kind`
    pub fn ttl(&self, kind: TokenKind) -> chrono::Duration {
        self.keys(kind).ttl
    }

    pub fn issue(&self, principal: &PrincipalId, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        self.issue_at(principal, kind, Utc::now())
    }

    /// Mint a token as if it were issued at `issued_at`
    pub fn issue_at(
        &self,
        principal: &PrincipalId,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(kind);
        let expires_at = issued_at
            .checked_add_signed(keys.ttl)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".to_string()))?;
        let claims = Claims {
            sub: principal.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            typ: kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Mint an access + refresh pair for `principal`
    pub fn issue_pair(&self, principal: &PrincipalId) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(principal, TokenKind::Access)?,
            refresh: self.issue(principal, TokenKind::Refresh)?,
        })
    }

    /// Check signature, expiry and kind, and return the subject
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<PrincipalId, TokenError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;

        if data.claims.typ != kind {
            return Err(TokenError::Malformed);
        }
        data.claims.sub.parse().map_err(|_| TokenError::Malformed)
    }
}
