//! Liveness and readiness checks.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub database: bool,
    pub payment_provider: &'static str,
    pub payment_ready: bool,
}

/// Readiness health check endpoint.
///
/// Returns 503 until the database answers and the payment provider is ready.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = sqlx::query("SELECT 1")
        .fetch_one(state.pool())
        .await
        .is_ok();
    let payment_ready = state.payments().is_ready();

    let status = if database && payment_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(Readiness {
            database,
            payment_provider: state.payments().provider_name(),
            payment_ready,
        }),
    )
}
