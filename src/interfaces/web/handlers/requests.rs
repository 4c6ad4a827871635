use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::super::AppState;
use super::{actor_from, error_response};
use crate::core::request::AuditAction;

#[derive(Deserialize)]
pub struct CreateRequestBody {
    pub title: String,
    #[serde(rename = "inputText")]
    pub input_text: String,
}

#[derive(Deserialize)]
pub struct ApproveBody {
    /// "APPROVE" (case-insensitive) approves; anything else rejects.
    pub decision: String,
    pub comment: Option<String>,
}

pub async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> impl IntoResponse {
    if body.title.trim().is_empty() || body.input_text.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "VALIDATION", "message": "title and inputText are required" })),
        );
    }

    let actor = actor_from(&headers);
    let started = Instant::now();
    let id = match state
        .store
        .create(&actor, body.title.trim(), body.input_text.trim())
        .await
    {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = state
        .store
        .audit(
            id,
            &actor,
            AuditAction::Create,
            "created",
            true,
            started.elapsed().as_millis() as u64,
        )
        .await
    {
        return error_response(&e);
    }

    (StatusCode::OK, Json(json!({ "id": id })))
}

pub async fn list_requests(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list().await {
        Ok(requests) => (StatusCode::OK, Json(json!(requests))),
        Err(e) => error_response(&e),
    }
}

pub async fn request_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let request = match state.store.find(id).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };
    let audit = match state.store.audit_list(id).await {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };
    let tickets = match state.store.tickets(id).await {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };
    let wiki_pages = match state.store.wiki_pages(id).await {
        Ok(w) => w,
        Err(e) => return error_response(&e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "request": request,
            "audit": audit,
            "tickets": tickets,
            "wikiPages": wiki_pages,
        })),
    )
}

pub async fn plan_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let actor = actor_from(&headers);
    match state.planning.plan(&actor, id).await {
        Ok(plan_json) => (
            StatusCode::OK,
            Json(json!({ "requestId": id, "planJson": plan_json })),
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn approve_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<ApproveBody>,
) -> impl IntoResponse {
    let actor = actor_from(&headers);
    let ok = body.decision.eq_ignore_ascii_case("APPROVE");
    let started = Instant::now();

    let status = match state.store.approve(id, &actor, ok).await {
        Ok(status) => status,
        Err(e) => return error_response(&e),
    };

    let action = if ok {
        AuditAction::Approve
    } else {
        AuditAction::Reject
    };
    if let Err(e) = state
        .store
        .audit(
            id,
            &actor,
            action,
            body.comment.as_deref().unwrap_or(""),
            true,
            started.elapsed().as_millis() as u64,
        )
        .await
    {
        return error_response(&e);
    }

    (
        StatusCode::OK,
        Json(json!({ "id": id, "status": status.as_str() })),
    )
}

pub async fn execute_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let actor = actor_from(&headers);
    match state.executor.execute(&actor, id).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(e) => error_response(&e),
    }
}
