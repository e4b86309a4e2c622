// =========================
// tests/unit/error_tests.rs
// =========================
//! Unit tests for the error module
use axum::{http::StatusCode, response::IntoResponse};
use serde_json::Value;
use vidtube_backend::auth::AuthError;
use vidtube_backend::error::{AppError, AUTH_FAILED_MESSAGE};

async fn body_of(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_error_body_shape() {
    let (status, body) = body_of(AppError::Validation("email is required".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_001");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("email is required"));
}

#[tokio::test]
async fn test_taxonomy_status_codes() {
    let cases = [
        (AuthError::Validation("x".into()), StatusCode::BAD_REQUEST),
        (AuthError::Conflict("x".into()), StatusCode::CONFLICT),
        (AuthError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AuthError::InvalidRefreshToken, StatusCode::UNAUTHORIZED),
        (AuthError::NotFound, StatusCode::NOT_FOUND),
        (AuthError::Upstream("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
        let (status, _) = body_of(err.into()).await;
        assert_eq!(status, expected);
    }
}

#[tokio::test]
async fn test_token_failures_are_indistinguishable() {
    let (_, a) = body_of(AuthError::Unauthorized.into()).await;
    let (_, b) = body_of(AuthError::InvalidRefreshToken.into()).await;
    assert_eq!(a, b);
    assert!(a["error"]["message"]
        .as_str()
        .unwrap()
        .contains(AUTH_FAILED_MESSAGE));
}

#[test]
fn test_sanitized_messages_hide_internals() {
    let err = AppError::Upstream("db at 10.0.0.5 refused connection".into());
    assert!(!err.sanitized_message().contains("10.0.0.5"));

    let err = AppError::Internal("stack details".into());
    assert_eq!(err.sanitized_message(), "An internal server error occurred");
}
