use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use super::super::AppState;
use super::error_response;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.stats().await {
        Ok(stats) => (axum::http::StatusCode::OK, Json(json!(stats))),
        Err(e) => error_response(&e),
    }
}
