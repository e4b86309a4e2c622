use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use vidtube_common::PrincipalView;

use crate::auth::extract_access_token;
use crate::error::AppError;
use crate::storage::PrincipalId;
use crate::AppState;

/// Authenticated principal for the current request.
///
/// Taking this extractor is what makes a handler protected: it runs the
/// authorization gate before the handler body and rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub PrincipalView);

impl CurrentPrincipal {
    pub fn id(&self) -> PrincipalId {
        PrincipalId(self.0.id)
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers);
        let principal = state.gate.authorize(token.as_deref()).await?;
        Ok(CurrentPrincipal(principal))
    }
}
