//! HTTP surface of the relay

pub mod chat;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};
use rill_ai::Upstream;
use serde::Serialize;
use std::sync::Arc;

/// Shared server state
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
}

pub type SharedState = Arc<AppState>;

/// Structured error body for non-2xx responses
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Assemble the relay router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/health", get(health::health))
        .with_state(state)
}
