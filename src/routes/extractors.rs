// ============================================================================
// Axum Extractors
// ============================================================================
//
// CurrentUser: resolves the bearer credential through the auth collaborator
// and yields the authenticated user's id.
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;

/// Extractor for the authenticated user's id.
///
/// Usage:
/// ```ignore
/// async fn handler(user: CurrentUser, ...) -> Result<...> {
///     let user_id = user.0;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::unauthenticated("Not authorized, no credential").into_response()
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthenticated("Invalid Authorization header format").into_response()
        })?;

        match state.auth.resolve(token).await {
            Ok(Some(user_id)) => Ok(CurrentUser(user_id)),
            Ok(None) => {
                Err(AppError::unauthenticated("Invalid or expired credential").into_response())
            }
            Err(e) => {
                tracing::error!(error = %e, "Auth service lookup failed");
                Err(AppError::internal(e.to_string()).into_response())
            }
        }
    }
}
