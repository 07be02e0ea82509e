use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Owner id used for the health probe's store round-trip
const HEALTH_SENTINEL: &str = "_health_check";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_count: Option<usize>,
}

/// Health check endpoint
///
/// Performs a lightweight store round-trip and reports reachability; a
/// store failure is reported, never propagated.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    match state.store.list_threads(HEALTH_SENTINEL).await {
        Ok(threads) => Json(HealthResponse {
            ok: true,
            database: "connected".to_string(),
            threads_count: Some(threads.len()),
        }),
        Err(e) => {
            tracing::warn!("Health check store round-trip failed: {}", e);
            Json(HealthResponse {
                ok: true,
                database: "disconnected".to_string(),
                threads_count: None,
            })
        }
    }
}
