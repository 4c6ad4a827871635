pub mod ops;
pub mod requests;

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use crate::core::error::OpsError;

const DEFAULT_ACTOR: &str = "demo";

/// Mutating calls carry the acting identity in X-Actor.
pub(crate) fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

/// One HTTP status per error kind so clients can branch without parsing
/// messages.
pub(crate) fn error_response(err: &OpsError) -> (StatusCode, Json<Value>) {
    let status = match err {
        OpsError::NotFound => StatusCode::NOT_FOUND,
        OpsError::InvalidState { .. } | OpsError::MissingPlan => StatusCode::CONFLICT,
        OpsError::MalformedPlan(_) | OpsError::UnknownTool(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OpsError::UpstreamInvalid(_) | OpsError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        OpsError::ToolFailed(_) | OpsError::Store(_) | OpsError::Serde(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(json!({ "error": err.kind(), "message": err.to_string() })),
    )
}
