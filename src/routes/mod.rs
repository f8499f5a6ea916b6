// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: router assembly and middleware
// - health.rs: health check and metrics endpoints
// - messages.rs: conversation and message endpoints
// - extractors.rs: CurrentUser bearer-credential extractor
//
// ============================================================================

mod extractors;
mod health;
mod messages;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

pub use extractors::CurrentUser;

/// Create the main application router with all routes
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring (no auth)
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Messaging (bearer-authenticated)
        .route(
            "/api/v1/messages/conversation",
            post(messages::create_conversation),
        )
        .route(
            "/api/v1/messages/conversations",
            get(messages::list_conversations),
        )
        .route("/api/v1/messages/unread/count", get(messages::unread_count))
        .route(
            "/api/v1/messages/:conversation_id",
            get(messages::list_messages).post(messages::send_message),
        )
        .fallback(not_found)
        // Tracing layer runs outermost.
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(ctx)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}
