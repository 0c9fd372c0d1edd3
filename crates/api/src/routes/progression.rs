//! Route definitions for the progression engine.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{privacy, progression};
use crate::state::AppState;

/// Routes mounted at `/progression`.
///
/// ```text
/// POST   /events                    -> record_event
/// GET    /events                    -> list_events
/// POST   /check-in                  -> check_in
/// GET    /stats                     -> get_stats
/// GET    /level                     -> level_for_total (public)
/// GET    /achievements              -> list_achievements
/// POST   /achievements/evaluate     -> evaluate_achievements
/// GET    /leaderboard               -> get_leaderboard
/// GET    /rank                      -> get_rank
/// GET    /privacy                   -> get_privacy
/// PUT    /privacy                   -> set_privacy
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/events",
            get(progression::list_events).post(progression::record_event),
        )
        .route("/check-in", post(progression::check_in))
        .route("/stats", get(progression::get_stats))
        .route("/level", get(progression::level_for_total))
        .route("/achievements", get(progression::list_achievements))
        .route(
            "/achievements/evaluate",
            post(progression::evaluate_achievements),
        )
        .route("/leaderboard", get(progression::get_leaderboard))
        .route("/rank", get(progression::get_rank))
        .route(
            "/privacy",
            get(privacy::get_privacy).put(privacy::set_privacy),
        )
}
