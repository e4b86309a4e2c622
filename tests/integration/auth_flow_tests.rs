// ==================================
// tests/integration/auth_flow_tests.rs
// ==================================
//! End-to-end session lifecycle through the library API
use std::sync::Arc;

use chrono::{Duration, Utc};
use vidtube_backend::{
    auth::{AuthError, AuthService, TokenKind},
    storage::CredentialStore,
};

use crate::test_utils::{register, setup_test_env};

#[tokio::test]
async fn test_refresh_rotation_lifecycle() {
    let (state, _dir) = setup_test_env().await;
    let id = register(&state, "alice", "p1").await;

    let login = state.auth.login("alice", "p1").await.unwrap();
    let r1 = login.tokens.refresh.token;
    let a1 = login.tokens.access.token;

    let user = state.gate.authorize(Some(&a1)).await.unwrap();
    assert_eq!(user.id, id.0);

    let pair = state.auth.refresh(&r1).await.unwrap();
    let r2 = pair.refresh.token;
    assert_ne!(r1, r2);

    // R1 was rotated away
    assert_eq!(
        state.auth.refresh(&r1).await.unwrap_err(),
        AuthError::InvalidRefreshToken
    );
    let r3 = state.auth.refresh(&r2).await.unwrap().refresh.token;

    let stored = state.sessions.store().find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(r3.as_str()));
}

#[tokio::test]
async fn test_new_login_supersedes_previous_session() {
    let (state, _dir) = setup_test_env().await;
    register(&state, "alice", "p1").await;

    let first = state.auth.login("alice", "p1").await.unwrap();
    let second = state.auth.login("alice@x.com", "p1").await.unwrap();

    assert_eq!(
        state.auth.refresh(&first.tokens.refresh.token).await.unwrap_err(),
        AuthError::InvalidRefreshToken
    );
    assert!(state.auth.refresh(&second.tokens.refresh.token).await.is_ok());
    // Access tokens stay valid until they expire
    assert!(state
        .gate
        .authorize(Some(&first.tokens.access.token))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_logout_invalidates_refresh() {
    let (state, _dir) = setup_test_env().await;
    let id = register(&state, "alice", "p1").await;
    let login = state.auth.login("alice", "p1").await.unwrap();

    state.auth.logout(&id).await.unwrap();
    // Second logout is a no-op
    state.auth.logout(&id).await.unwrap();

    assert_eq!(
        state.auth.refresh(&login.tokens.refresh.token).await.unwrap_err(),
        AuthError::InvalidRefreshToken
    );
}

#[tokio::test]
async fn test_change_password_then_login() {
    let (state, _dir) = setup_test_env().await;
    let id = register(&state, "alice", "p1").await;

    state
        .auth
        .change_password(&id, "p1", "p2", "p2")
        .await
        .unwrap();

    assert_eq!(
        state.auth.login("alice", "p1").await.unwrap_err(),
        AuthError::Unauthorized
    );
    assert!(state.auth.login("alice", "p2").await.is_ok());
}

#[tokio::test]
async fn test_wrong_old_password_leaves_hash_untouched() {
    let (state, _dir) = setup_test_env().await;
    let id = register(&state, "alice", "p1").await;
    let before = state
        .sessions
        .store()
        .find_by_id(&id)
        .await
        .unwrap()
        .unwrap()
        .password_hash;

    assert_eq!(
        state
            .auth
            .change_password(&id, "nope", "p2", "p2")
            .await
            .unwrap_err(),
        AuthError::Unauthorized
    );
    assert!(matches!(
        state
            .auth
            .change_password(&id, "p1", "p2", "p3")
            .await
            .unwrap_err(),
        AuthError::Validation(_)
    ));

    let after = state
        .sessions
        .store()
        .find_by_id(&id)
        .await
        .unwrap()
        .unwrap()
        .password_hash;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_login_failures() {
    let (state, _dir) = setup_test_env().await;
    register(&state, "alice", "p1").await;

    assert_eq!(
        state.auth.login("alice", "wrong").await.unwrap_err(),
        AuthError::Unauthorized
    );
    assert_eq!(
        state.auth.login("bob", "p1").await.unwrap_err(),
        AuthError::NotFound
    );
    assert!(matches!(
        state.auth.login("", "p1").await.unwrap_err(),
        AuthError::Validation(_)
    ));
    // Identity keys are case-insensitive
    assert!(state.auth.login("ALICE", "p1").await.is_ok());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (state, _dir) = setup_test_env().await;
    register(&state, "alice", "p1").await;

    let err = state
        .auth
        .register("Alice", "other@x.com", "Other", "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));

    let err = state
        .auth
        .register("other", "ALICE@x.com", "Other", "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));
}

#[tokio::test]
async fn test_gate_rejects_expired_and_wrong_kind() {
    let (state, _dir) = setup_test_env().await;
    let id = register(&state, "alice", "p1").await;
    let codec = state.sessions.codec();

    let stale = codec
        .issue_at(&id, TokenKind::Access, Utc::now() - Duration::hours(1))
        .unwrap();
    assert_eq!(
        state.gate.authorize(Some(&stale.token)).await.unwrap_err(),
        AuthError::Unauthorized
    );

    let refresh = codec.issue(&id, TokenKind::Refresh).unwrap();
    assert_eq!(
        state.gate.authorize(Some(&refresh.token)).await.unwrap_err(),
        AuthError::Unauthorized
    );
    assert_eq!(
        state.gate.authorize(None).await.unwrap_err(),
        AuthError::Unauthorized
    );
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let (state, _dir) = setup_test_env().await;
    register(&state, "alice", "p1").await;
    let login = state.auth.login("alice", "p1").await.unwrap();

    assert_eq!(
        state.auth.refresh(&login.tokens.access.token).await.unwrap_err(),
        AuthError::InvalidRefreshToken
    );
    // The stored token was not disturbed
    assert!(state.auth.refresh(&login.tokens.refresh.token).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_refresh_has_single_winner() {
    let (state, _dir) = setup_test_env().await;
    register(&state, "alice", "p1").await;
    let refresh = Arc::new(state.auth.login("alice", "p1").await.unwrap().tokens.refresh.token);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let refresh = refresh.clone();
        handles.push(tokio::spawn(async move { state.auth.refresh(&refresh).await }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e, AuthError::InvalidRefreshToken),
        }
    }
    assert_eq!(winners, 1);
}
