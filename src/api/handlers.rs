//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, PingResponse};
use super::AppState;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Keep-alive probe
        .route("/ping", get(ping))
        .route("/health", get(health))
        // Version
        .route("/version", get(get_version))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse { status: "alive" })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.sessions.active_sessions().await,
    })
}

async fn get_version() -> &'static str {
    concat!("post-composer ", env!("CARGO_PKG_VERSION"))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
