use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::rbac::Role;
use crate::errors::AppError;
use crate::AppState;

pub const MISSING_HEADER: &str = "Missing Authorization header";
pub const AUTH_REQUIRED: &str = "Authentication required";
pub const INVALID_TOKEN: &str = "Invalid or expired token";

/// The authenticated caller, attached to the request by [`require_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub role: Role,
}

/// Pull the bearer token out of the `Authorization` header. Each failure
/// carries the message returned to the caller.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if value.is_empty() {
        return Err(MISSING_HEADER);
    }
    let token = value.strip_prefix("Bearer ").ok_or(AUTH_REQUIRED)?;
    if token.is_empty() {
        return Err(AUTH_REQUIRED);
    }
    Ok(token)
}

/// Middleware: authenticates the bearer token and inserts an [`Identity`].
/// Every failure is a 401; route-level role checks happen in the handlers.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map_err(|msg| {
        tracing::debug!(path = %req.uri().path(), "auth rejected: {}", msg);
        AppError::Unauthenticated(msg)
    })?;

    let role = state.tokens.verify(token).map_err(|e| {
        tracing::warn!(error = %e, "token verification failed");
        AppError::Unauthenticated(INVALID_TOKEN)
    })?;

    tracing::debug!(role = %role, "successfully authenticated");
    req.extensions_mut().insert(Identity { role });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    /// A handler reached without an identity is treated like a caller whose
    /// role is not allowed: 403.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or(AppError::Forbidden)
    }
}
