//! HTTP handlers for the annotation containers.

use axum::{extract::State, Json};
use serde::Serialize;

use glossa_db::log_pool_metrics;

use crate::AppState;

pub mod annotations;
pub mod collections;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `ok`, `unavailable`, or `not configured` for in-memory state.
    pub database: &'static str,
}

/// Liveness plus, when a database is attached, a round trip to it.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match &state.database {
        None => ("healthy", "not configured"),
        Some(db) => {
            log_pool_metrics(db.pool());
            match db.ping().await {
                Ok(()) => ("healthy", "ok"),
                Err(e) => {
                    tracing::warn!(subsystem = "api", error = %e, "Database ping failed");
                    ("degraded", "unavailable")
                }
            }
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
