//! Achievement unlock records.

use serde::Serialize;
use sqlx::FromRow;
use homestead_core::types::{DbId, Timestamp};

/// A row from the `user_achievements` table. Never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserAchievement {
    pub id: DbId,
    pub user_id: DbId,
    pub achievement_id: String,
    pub unlocked_at: Timestamp,
}
