//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?limit=` for list endpoints.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// `?total_xp=` for the level calculator endpoint.
#[derive(Debug, Deserialize)]
pub struct LevelParams {
    pub total_xp: i64,
}
