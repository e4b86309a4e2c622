// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router for the session service.
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ServerSettings;
use crate::handlers::{self, users};
use crate::AppState;

/// Prefix every user route is mounted under
pub const USERS_PREFIX: &str = "/api/v1/users";

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = state.settings.clone();

    let media_routes = Router::new()
        .route("/update-avatar", patch(users::update_avatar))
        .route("/update-cover-image", patch(users::update_cover_image))
        .route("/update-cover", patch(users::update_cover_image))
        .layer(DefaultBodyLimit::max(settings.media.max_upload_bytes));

    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/refresh-token", post(users::refresh_token))
        .route("/change-password", post(users::change_password))
        .route("/current-user", get(users::current_user))
        .route("/update-account", patch(users::update_account))
        .layer(DefaultBodyLimit::max(settings.server.json_body_limit_bytes))
        .merge(media_routes);

    let router = Router::new()
        .route("/health", get(handlers::health))
        .nest(USERS_PREFIX, user_routes)
        .nest_service("/media", ServeDir::new(&settings.media.path))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors_layer(&settings.server) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Credentialed CORS for the single configured origin
fn cors_layer(server: &ServerSettings) -> Option<CorsLayer> {
    let origin = server.cors_origin.as_deref()?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            warn!(origin, error = %e, "ignoring invalid CORS origin");
            return None;
        },
    };
    info!(origin = ?origin, "CORS enabled");

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}
