//! Leaderboard privacy settings models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use homestead_core::leaderboard::VisibilitySnapshot;
use homestead_core::types::{DbId, Timestamp};

/// A row from the `user_privacy_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPrivacySettings {
    pub user_id: DbId,
    pub show_on_leaderboard: bool,
    pub display_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserPrivacySettings {
    pub fn snapshot(&self) -> VisibilitySnapshot {
        VisibilitySnapshot {
            user_id: self.user_id,
            show_on_leaderboard: self.show_on_leaderboard,
            display_name: Some(self.display_name.clone()),
        }
    }
}

/// DTO for creating or replacing a user's privacy settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertPrivacySettings {
    pub show_on_leaderboard: bool,
    #[validate(length(min = 1, max = 50))]
    pub display_name: String,
}
