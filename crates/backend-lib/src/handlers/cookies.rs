//! `Set-Cookie` values for the token pair.
use axum::http::{header::SET_COOKIE, HeaderName, HeaderValue};
use vidtube_common::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

use crate::auth::{TokenKind, TokenPair};
use crate::config::CookieSettings;
use crate::error::AppError;

/// HttpOnly cookie with the configured `Secure`/`SameSite`/`Path` attributes
pub fn set_cookie(
    name: &str,
    value: &str,
    max_age_secs: i64,
    settings: &CookieSettings,
) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{name}={value}; HttpOnly; SameSite={}; Path={}; Max-Age={max_age_secs}",
        settings.same_site.as_str(),
        settings.path,
    );
    if settings.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(format!("bad cookie: {e}")))
}

/// Expire a cookie on the client
pub fn clear_cookie(name: &str, settings: &CookieSettings) -> Result<HeaderValue, AppError> {
    set_cookie(name, "", 0, settings)
}

fn max_age(pair: &TokenPair, kind: TokenKind) -> i64 {
    let token = match kind {
        TokenKind::Access => &pair.access,
        TokenKind::Refresh => &pair.refresh,
    };
    (token.expires_at - chrono::Utc::now()).num_seconds().max(0)
}

/// Both token cookies, ready for `AppendHeaders`
pub fn token_cookies(
    pair: &TokenPair,
    settings: &CookieSettings,
) -> Result<[(HeaderName, HeaderValue); 2], AppError> {
    Ok([
        (
            SET_COOKIE,
            set_cookie(
                ACCESS_TOKEN_COOKIE,
                &pair.access.token,
                max_age(pair, TokenKind::Access),
                settings,
            )?,
        ),
        (
            SET_COOKIE,
            set_cookie(
                REFRESH_TOKEN_COOKIE,
                &pair.refresh.token,
                max_age(pair, TokenKind::Refresh),
                settings,
            )?,
        ),
    ])
}

pub fn cleared_token_cookies(
    settings: &CookieSettings,
) -> Result<[(HeaderName, HeaderValue); 2], AppError> {
    Ok([
        (SET_COOKIE, clear_cookie(ACCESS_TOKEN_COOKIE, settings)?),
        (SET_COOKIE, clear_cookie(REFRESH_TOKEN_COOKIE, settings)?),
    ])
}
