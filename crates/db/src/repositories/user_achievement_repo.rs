//! Repository for the `user_achievements` table.

use homestead_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_achievement::UserAchievement;

/// Column list for `user_achievements` queries.
const COLUMNS: &str = "id, user_id, achievement_id, unlocked_at";

/// Provides insert-once and read operations for achievement unlocks.
pub struct UserAchievementRepo;

impl UserAchievementRepo {
    /// List all unlocks for a user, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserAchievement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_achievements \
             WHERE user_id = $1 \
             ORDER BY unlocked_at, id"
        );
        sqlx::query_as::<_, UserAchievement>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Persist a batch of unlocks in one transaction.
    ///
    /// Ids the user already holds are skipped, so re-running after a partial
    /// failure never creates a second row. Returns only the rows inserted by
    /// this call.
    pub async fn unlock_many(
        pool: &PgPool,
        user_id: DbId,
        achievement_ids: &[&str],
    ) -> Result<Vec<UserAchievement>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = Vec::with_capacity(achievement_ids.len());

        let query = format!(
            "INSERT INTO user_achievements (user_id, achievement_id) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id, achievement_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );

        for achievement_id in achievement_ids {
            let row = sqlx::query_as::<_, UserAchievement>(&query)
                .bind(user_id)
                .bind(*achievement_id)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(row) = row {
                inserted.push(row);
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
