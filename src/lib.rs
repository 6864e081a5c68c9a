//! objgate: role-gated HTTP gateway in front of an upstream objects API.
//!
//! The library holds everything but process startup so integration tests in
//! `tests/` can build the router around a stub store.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod store;

use middleware::token::TokenService;
use store::ObjectStore;

/// Shared application state passed to handlers and middleware.
/// Built once at startup and read-only afterwards.
pub struct AppState {
    pub config: config::Config,
    pub tokens: TokenService,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(config: config::Config, store: Arc<dyn ObjectStore>) -> Self {
        let tokens = TokenService::new(config.auth_secret_key.clone());
        Self { config, tokens, store }
    }
}
