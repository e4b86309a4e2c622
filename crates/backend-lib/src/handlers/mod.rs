//! HTTP handlers.

pub mod cookies;
pub mod users;

use axum::{extract::FromRequest, Json};
use serde_json::{json, Value};

use crate::error::AppError;

/// JSON request body whose rejections go through [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
