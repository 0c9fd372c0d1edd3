//! Handlers for XP, levels, achievements, and the leaderboard.
//!
//! Everything except [`level_for_total`] requires authentication via
//! [`AuthUser`]; the caller's id is the only user these handlers act on.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use homestead_core::leveling::progress_within_level;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::progression::{ProgressionService, RecordAction};
use crate::query::{LevelParams, LimitParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// POST /api/v1/progression/events
///
/// Record a qualifying action at its reward-table value. Returns 201 for a
/// new event and 200 when the idempotency key matched an earlier one.
pub async fn record_event(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RecordAction>,
) -> AppResult<impl IntoResponse> {
    let update = ProgressionService::from_state(&state)
        .record_action(user.user_id, input)
        .await?;

    let status = if update.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(DataResponse { data: update })))
}

/// GET /api/v1/progression/events?limit=
///
/// The caller's most recent ledger events, newest first.
pub async fn list_events(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    let events = ProgressionService::from_state(&state)
        .recent_events(user.user_id, params.limit)
        .await;
    Ok(Json(DataResponse { data: events }))
}

/// POST /api/v1/progression/check-in
///
/// Award the daily login bonus, at most once per UTC day.
pub async fn check_in(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let today = Utc::now().date_naive();
    let update = ProgressionService::from_state(&state)
        .check_in(user.user_id, today)
        .await?;

    let status = if update.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(DataResponse { data: update })))
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// GET /api/v1/progression/stats
pub async fn get_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stats = ProgressionService::from_state(&state)
        .stats(user.user_id)
        .await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/progression/level?total_xp=
///
/// Pure level calculation. No authentication, no store access.
pub async fn level_for_total(
    Query(params): Query<LevelParams>,
) -> AppResult<impl IntoResponse> {
    let progress = progress_within_level(params.total_xp)?;
    Ok(Json(DataResponse { data: progress }))
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

/// GET /api/v1/progression/achievements
///
/// The catalog annotated with the caller's unlocks.
pub async fn list_achievements(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let achievements = ProgressionService::from_state(&state)
        .achievements(user.user_id)
        .await;
    Ok(Json(DataResponse { data: achievements }))
}

/// POST /api/v1/progression/achievements/evaluate
///
/// Re-run evaluation against fresh counters and persist anything new.
pub async fn evaluate_achievements(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let evaluation = ProgressionService::from_state(&state)
        .evaluate_achievements(user.user_id)
        .await?;
    Ok(Json(DataResponse { data: evaluation }))
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// GET /api/v1/progression/leaderboard?limit=
pub async fn get_leaderboard(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    let entries = ProgressionService::from_state(&state)
        .leaderboard(params.limit)
        .await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/progression/rank
///
/// The caller's rank over every user with stats. 404 before the first award.
pub async fn get_rank(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rank = ProgressionService::from_state(&state)
        .user_rank(user.user_id)
        .await?;
    Ok(Json(DataResponse { data: rank }))
}
