//! `/api/v1/users` handlers.
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::json;
use tracing::debug;
use vidtube_common::{
    ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest,
    RegisterRequest, TokenPairBody, UpdateAccountRequest, REFRESH_TOKEN_COOKIE,
};

use super::cookies::{cleared_token_cookies, token_cookies};
use super::JsonBody;
use crate::auth::{cookie_value, AuthError};
use crate::error::AppError;
use crate::media::MediaUpload;
use crate::middleware::CurrentPrincipal;
use crate::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .register(&req.username, &req.email, &req.full_name, &req.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(201, user, "User registered successfully")),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.auth.login(&req.username_or_email, &req.password).await?;
    let cookies = token_cookies(&outcome.tokens, &state.settings.cookies)?;

    let body = LoginResponse {
        user: outcome.principal,
        access_token: outcome.tokens.access.token,
        refresh_token: outcome.tokens.refresh.token,
    };
    Ok((
        AppendHeaders(cookies),
        Json(ApiResponse::new(200, body, "User logged in successfully")),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    principal: CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(&principal.id()).await?;
    let cookies = cleared_token_cookies(&state.settings.cookies)?;
    Ok((
        AppendHeaders(cookies),
        Json(ApiResponse::new(200, json!({}), "User logged out")),
    ))
}

/// Refresh token from the `refreshToken` cookie, else from a JSON body
fn presented_refresh_token(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    if let Some(token) = cookie_value(headers, REFRESH_TOKEN_COOKIE).filter(|t| !t.is_empty()) {
        return Some(token);
    }
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<RefreshRequest>(body) {
        Ok(req) => req.refresh_token.filter(|t| !t.is_empty()),
        Err(e) => {
            debug!(error = %e, "unreadable refresh body");
            None
        },
    }
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let token = presented_refresh_token(&headers, &body).ok_or(AuthError::InvalidRefreshToken)?;
    let tokens = state.auth.refresh(&token).await?;
    let cookies = token_cookies(&tokens, &state.settings.cookies)?;

    let body = TokenPairBody {
        access_token: tokens.access.token,
        refresh_token: tokens.refresh.token,
    };
    Ok((
        AppendHeaders(cookies),
        Json(ApiResponse::new(200, body, "Access token refreshed")),
    ))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    principal: CurrentPrincipal,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .change_password(
            &principal.id(),
            &req.old_password,
            &req.new_password,
            &req.confirm_new_password,
        )
        .await?;
    Ok(Json(ApiResponse::new(
        200,
        json!({}),
        "Password changed successfully",
    )))
}

pub async fn current_user(principal: CurrentPrincipal) -> impl IntoResponse {
    Json(ApiResponse::new(
        200,
        principal.0,
        "Current user fetched successfully",
    ))
}

pub async fn update_account(
    State(state): State<Arc<AppState>>,
    principal: CurrentPrincipal,
    JsonBody(req): JsonBody<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .profiles
        .update_account(&principal.id(), &req.full_name, &req.email)
        .await?;
    Ok(Json(ApiResponse::new(
        200,
        user,
        "Account details updated successfully",
    )))
}

/// First multipart field called `name`
async fn read_upload(
    multipart: &mut Multipart,
    name: &str,
) -> Result<Option<MediaUpload>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        return Ok(Some(MediaUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

pub async fn update_avatar(
    State(state): State<Arc<AppState>>,
    principal: CurrentPrincipal,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(&mut multipart, "avatar").await?;
    let user = state.profiles.update_avatar(&principal.id(), upload).await?;
    Ok(Json(ApiResponse::new(200, user, "Avatar updated successfully")))
}

pub async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    principal: CurrentPrincipal,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(&mut multipart, "coverImage").await?;
    let user = state
        .profiles
        .update_cover_image(&principal.id(), upload)
        .await?;
    Ok(Json(ApiResponse::new(
        200,
        user,
        "Cover image updated successfully",
    )))
}
