use thiserror::Error;

use crate::storage::StoreError;

/// Failures of the session manager, the gate and the profile service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("user does not exist")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => AuthError::Conflict(format!("{field} already taken")),
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Backend(msg) => AuthError::Upstream(msg),
        }
    }
}
