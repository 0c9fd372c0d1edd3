//! Cached per-user XP aggregate.

use serde::Serialize;
use sqlx::FromRow;
use homestead_core::leaderboard::StatsSnapshot;
use homestead_core::types::{DbId, Timestamp};

/// A row from the `user_stats` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserStats {
    pub user_id: DbId,
    pub total_xp: i64,
    pub level: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            user_id: self.user_id,
            total_xp: self.total_xp,
        }
    }
}
