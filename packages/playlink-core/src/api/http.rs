//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the session and registry.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::PlaylinkResult;
use crate::protocol_constants::{PROTOCOL_ID, SERVICE_ID};
use crate::session::SessionSnapshot;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/session", get(get_session))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "protocol": PROTOCOL_ID,
        "clients": {
            "bound": state.bind_point.bound_count(),
            "registered": state.registry.client_count(),
            "connections": state.ws_manager.connection_count(),
        }
    }))
}

async fn get_session(State(state): State<AppState>) -> PlaylinkResult<Json<SessionSnapshot>> {
    let snapshot = state.session.snapshot().await?;
    Ok(Json(snapshot))
}
