//! Repository for the `user_privacy_settings` table.

use homestead_core::types::DbId;
use sqlx::PgPool;

use crate::models::privacy::{UpsertPrivacySettings, UserPrivacySettings};

/// Column list for `user_privacy_settings` queries.
const COLUMNS: &str = "user_id, show_on_leaderboard, display_name, created_at, updated_at";

/// Provides upsert and read operations for leaderboard privacy settings.
pub struct PrivacySettingsRepo;

impl PrivacySettingsRepo {
    /// Get a user's privacy settings, if they have saved any.
    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserPrivacySettings>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_privacy_settings WHERE user_id = $1");
        sqlx::query_as::<_, UserPrivacySettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create or replace a user's privacy settings.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertPrivacySettings,
    ) -> Result<UserPrivacySettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_privacy_settings (user_id, show_on_leaderboard, display_name) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 show_on_leaderboard = EXCLUDED.show_on_leaderboard, \
                 display_name = EXCLUDED.display_name \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPrivacySettings>(&query)
            .bind(user_id)
            .bind(input.show_on_leaderboard)
            .bind(&input.display_name)
            .fetch_one(pool)
            .await
    }

    /// List every user who opted into the public leaderboard.
    pub async fn list_opted_in(pool: &PgPool) -> Result<Vec<UserPrivacySettings>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_privacy_settings \
             WHERE show_on_leaderboard \
             ORDER BY user_id"
        );
        sqlx::query_as::<_, UserPrivacySettings>(&query)
            .fetch_all(pool)
            .await
    }
}
