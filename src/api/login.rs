use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::rbac::Role;
use crate::models::envelope::respond;
use crate::AppState;

const INVALID_ROLE: &str = "invalid role option";
const LOGIN_FAILED: &str = "could not authenticate. Try again later";

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// GET /login?role=admin|member: issue a short-lived token for the role
pub async fn login(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LoginParams>, QueryRejection>,
) -> Result<Response, AppError> {
    // A query string that does not parse (e.g. `role` given twice) is an
    // invalid role like any other.
    let role = params
        .ok()
        .and_then(|Query(params)| params.role)
        .and_then(|role| role.parse::<Role>().ok())
        .ok_or_else(|| {
            tracing::debug!("login rejected");
            AppError::Validation(INVALID_ROLE.to_string())
        })?;

    let token = state
        .tokens
        .issue(role)
        .map_err(|e| AppError::from_token(e, LOGIN_FAILED))?;

    tracing::info!(role = %role, "token issued");
    Ok(respond(
        StatusCode::CREATED,
        "Successfully authenticated",
        Some(LoginResponse { token }),
    ))
}
