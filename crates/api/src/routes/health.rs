use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

/// Liveness plus a database round-trip. Returns 503 when the store is down.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, database, code) = match homestead_db::health_check(&state.pool).await {
        Ok(()) => ("ok", "ok", StatusCode::OK),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            ("degraded", "unreachable", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
