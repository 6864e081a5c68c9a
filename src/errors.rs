use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::middleware::token::TokenError;
use crate::models::envelope::respond_message;
use crate::store::StoreError;

pub const FORBIDDEN_MESSAGE: &str = "Recognized but you are not allowed to perform this operation";

#[derive(Debug, Error)]
pub enum AppError {
    /// The server cannot sign tokens because no secret is configured.
    #[error("configuration error: {source}")]
    Configuration {
        message: String,
        #[source]
        source: TokenError,
    },

    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("forbidden")]
    Forbidden,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// `message` is what the caller sees; `source` only reaches the logs.
    #[error("upstream error: {source}")]
    Upstream {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("route not found")]
    RouteNotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("internal error: {source:#}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn upstream(source: StoreError, message: &str) -> Self {
        AppError::Upstream {
            message: message.to_string(),
            source,
        }
    }

    /// Map an adapter failure for one operation. `NoData` becomes a 400 with
    /// `not_found`; everything else is a 500 with `failure`.
    pub fn from_store(err: StoreError, not_found: &str, failure: &str) -> Self {
        match err {
            StoreError::NoData => AppError::NotFound(not_found.to_string()),
            other => AppError::upstream(other, failure),
        }
    }

    /// Map a token issuance failure. A missing secret is a configuration
    /// error; anything else is internal. Both answer 500 with `failure`.
    pub fn from_token(err: TokenError, failure: &str) -> Self {
        match err {
            TokenError::MissingSecret => AppError::Configuration {
                message: failure.to_string(),
                source: err,
            },
            other => AppError::Internal {
                message: failure.to_string(),
                source: anyhow::Error::new(other),
            },
        }
    }
}


impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated(msg) => respond_message(StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden => respond_message(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE),
            AppError::Validation(msg) => respond_message(StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => respond_message(StatusCode::BAD_REQUEST, msg),
            AppError::RouteNotFound => respond_message(StatusCode::NOT_FOUND, "resource not found"),
            AppError::Upstream { message, source } => {
                tracing::error!(error = %source, "upstream call failed");
                respond_message(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::MethodNotAllowed => {
                respond_message(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
            }
            AppError::Configuration { message, source } => {
                tracing::error!("Configuration error: {}", source);
                respond_message(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::Internal { message, source } => {
                tracing::error!("Internal error: {:#}", source);
                respond_message(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}
