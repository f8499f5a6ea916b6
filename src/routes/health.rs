// ============================================================================
// Health and Metrics Routes
// ============================================================================
//
// Endpoints:
// - GET /health  - liveness + record store ping
// - GET /metrics - Prometheus metrics
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::metrics;

/// GET /health
pub async fn health_check(
    State(ctx): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    match ctx.store.ping().await {
        Ok(_) => Ok((StatusCode::OK, "OK")),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            Ok((StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"))
        }
    }
}

/// GET /metrics
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    match metrics::gather_metrics() {
        Ok(metrics_data) => Ok((
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            metrics_data,
        )),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain")],
                "Internal Server Error".to_string(),
            ))
        }
    }
}
