//! Handlers for the caller's leaderboard visibility.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use homestead_db::models::privacy::UpsertPrivacySettings;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::progression::ProgressionService;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/progression/privacy
///
/// Returns 204 if the caller has never saved settings.
pub async fn get_privacy(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let settings = ProgressionService::from_state(&state)
        .privacy(user.user_id)
        .await?;

    match settings {
        Some(s) => Ok(Json(DataResponse { data: s }).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// PUT /api/v1/progression/privacy
pub async fn set_privacy(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpsertPrivacySettings>,
) -> AppResult<impl IntoResponse> {
    let settings = ProgressionService::from_state(&state)
        .update_privacy(user.user_id, input)
        .await?;
    Ok(Json(DataResponse { data: settings }))
}
