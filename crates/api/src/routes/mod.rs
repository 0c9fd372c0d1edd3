pub mod health;
pub mod progression;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /progression    -> XP ledger, levels, achievements, leaderboard, privacy
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/progression", progression::router())
}
