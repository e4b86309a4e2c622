// =========================
// tests/unit/store_tests.rs
// =========================
//! Credential store behavior as seen through the session manager
use std::sync::Arc;

use crate::test_utils::{register, setup_with, test_settings, FlakyCredentialStore, FlakyMediaStore};
use tempfile::TempDir;
use vidtube_backend::{
    auth::{AuthError, AuthService},
    media::FlatFileMediaStore,
    storage::{CredentialStore, FlatFileCredentialStore},
    AppState,
};

async fn flat_file_state(temp_dir: &TempDir) -> Arc<AppState> {
    let settings = test_settings(temp_dir);
    let store = FlatFileCredentialStore::open(&settings.storage.path)
        .await
        .unwrap();
    let media = FlatFileMediaStore::open(&settings.media.path, &settings.media.public_base_url)
        .await
        .unwrap();
    Arc::new(AppState::new(Arc::new(store), Arc::new(media), &settings).unwrap())
}

#[tokio::test]
async fn test_sessions_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    let refresh = {
        let state = flat_file_state(&temp_dir).await;
        register(&state, "alice", "p1").await;
        state.auth.login("alice", "p1").await.unwrap().tokens.refresh.token
    };

    // Fresh process over the same directory
    let state = flat_file_state(&temp_dir).await;
    let pair = state.auth.refresh(&refresh).await.unwrap();
    assert_ne!(pair.refresh.token, refresh);
    assert_eq!(
        state.auth.refresh(&refresh).await.unwrap_err(),
        AuthError::InvalidRefreshToken
    );
}

#[tokio::test]
async fn test_password_hash_is_never_plaintext_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let state = flat_file_state(&temp_dir).await;
    register(&state, "alice", "correct-horse").await;

    let settings = test_settings(&temp_dir);
    let raw = std::fs::read_to_string(settings.storage.path.join("principals.json")).unwrap();
    assert!(raw.contains("$scrypt$"));
    assert!(!raw.contains("correct-horse"));
}

#[tokio::test]
async fn test_datastore_failures_are_upstream() {
    let store = FlakyCredentialStore::new();
    let (state, _dir) = setup_with(Arc::new(store.clone()), Arc::new(FlakyMediaStore::new()));
    let id = register(&state, "alice", "p1").await;
    let refresh = state.auth.login("alice", "p1").await.unwrap().tokens.refresh.token;

    store.fail_writes(true);
    assert!(matches!(
        state.auth.logout(&id).await.unwrap_err(),
        AuthError::Upstream(_)
    ));
    assert!(matches!(
        state.auth.login("alice", "p1").await.unwrap_err(),
        AuthError::Upstream(_)
    ));
    assert!(matches!(
        state.auth.refresh(&refresh).await.unwrap_err(),
        AuthError::Upstream(_)
    ));

    // Nothing was written while failing, so the old token still works
    store.fail_writes(false);
    let stored = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(refresh.as_str()));
    assert!(state.auth.refresh(&refresh).await.is_ok());
}
