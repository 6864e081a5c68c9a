use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::{auth, request_log};
use crate::AppState;

pub mod handlers;
pub mod login;

/// Build the full gateway router.
///
/// `/login` and `/healthz` are open; everything under `/api/v1` goes
/// through the token gate. The gate is a route layer, so unknown paths fall
/// through to the 404 envelope without being authenticated, and a known path
/// hit with an unsupported method gets the 405 envelope.
pub fn router(state: Arc<AppState>) -> Router {
    let objects = Router::new()
        .route(
            "/objects",
            get(handlers::list_objects)
                .post(handlers::create_object)
                .fallback(method_not_allowed),
        )
        .route(
            "/objects/:id",
            get(handlers::get_object)
                .put(handlers::update_object)
                .patch(handlers::patch_object)
                .delete(handlers::delete_object)
                .fallback(method_not_allowed),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::require_token));

    Router::new()
        .route("/healthz", get(|| async { "ok" }).fallback(method_not_allowed))
        .route("/login", get(login::login).fallback(method_not_allowed))
        .nest("/api/v1", objects)
        .fallback(fallback_404)
        .with_state(state)
        .layer(from_fn(request_log::access_log))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_log::request_id))
}

async fn fallback_404() -> AppError {
    AppError::RouteNotFound
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
