//! Liveness check, used for deployment verification

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: String,
}

// GET /api/health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}
