use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{ops, requests};

pub fn build_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/api/health", get(ops::health))
        .route(
            "/api/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/api/requests/{id}", get(requests::request_detail))
        .route("/api/requests/{id}/plan", post(requests::plan_request))
        .route("/api/requests/{id}/approve", post(requests::approve_request))
        .route("/api/requests/{id}/execute", post(requests::execute_request))
        .route("/api/ops/stats", get(ops::stats))
        .layer(cors)
        .with_state(state)
}
