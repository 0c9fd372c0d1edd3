//! Repository for the `user_stats` table.
//!
//! `user_stats` caches the ledger sum. It is written only through
//! [`UserStatsRepo::increment`] (inside the ledger transaction) and the
//! reconciliation methods, all of which derive `level` from `total_xp` in the
//! same statement.

use homestead_core::leveling::XP_PER_LEVEL;
use homestead_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::user_stats::UserStats;

/// Column list for `user_stats` queries.
const COLUMNS: &str = "user_id, total_xp, level, created_at, updated_at";

/// Provides read and maintenance operations for cached user stats.
pub struct UserStatsRepo;

impl UserStatsRepo {
    /// Find the stats row for a user.
    pub async fn find(pool: &PgPool, user_id: DbId) -> Result<Option<UserStats>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_stats WHERE user_id = $1");
        sqlx::query_as::<_, UserStats>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List every stats row, highest total first. Ties are ordered by
    /// `user_id` so the ranking input is deterministic.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<UserStats>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_stats \
             ORDER BY total_xp DESC, user_id ASC"
        );
        sqlx::query_as::<_, UserStats>(&query).fetch_all(pool).await
    }

    /// List stats rows for the given users, highest total first.
    pub async fn list_for_users(
        pool: &PgPool,
        user_ids: &[DbId],
    ) -> Result<Vec<UserStats>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_stats \
             WHERE user_id = ANY($1) \
             ORDER BY total_xp DESC, user_id ASC"
        );
        sqlx::query_as::<_, UserStats>(&query)
            .bind(user_ids)
            .fetch_all(pool)
            .await
    }

    /// Atomically add `xp` to a user's total and recompute the level.
    ///
    /// Creates the row on first award. Runs on the caller's connection so it
    /// can share the ledger insert's transaction.
    pub async fn increment(
        conn: &mut PgConnection,
        user_id: DbId,
        xp: i64,
    ) -> Result<UserStats, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_stats (user_id, total_xp, level) \
             VALUES ($1, $2, ($2 / $3 + 1)::INTEGER) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 total_xp = user_stats.total_xp + EXCLUDED.total_xp, \
                 level = ((user_stats.total_xp + EXCLUDED.total_xp) / $3 + 1)::INTEGER \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserStats>(&query)
            .bind(user_id)
            .bind(xp)
            .bind(XP_PER_LEVEL)
            .fetch_one(&mut *conn)
            .await
    }

    /// Read a user's stats row on the caller's connection.
    pub async fn find_on(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Option<UserStats>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_stats WHERE user_id = $1");
        sqlx::query_as::<_, UserStats>(&query)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Rebuild one user's stats row from the ledger sum.
    ///
    /// Must run inside a transaction: the row lock taken here is what keeps a
    /// concurrent [`Self::increment`] from being overwritten, and it is held
    /// until the caller commits. Always returns a row; a user with no events
    /// gets `total_xp = 0`, `level = 1`.
    pub async fn reconcile_user_on(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<UserStats, sqlx::Error> {
        let (stats, _) = Self::rebuild_locked(conn, user_id).await?;
        Ok(stats)
    }

    /// Transactional wrapper around [`Self::reconcile_user_on`].
    pub async fn reconcile_user(pool: &PgPool, user_id: DbId) -> Result<UserStats, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let stats = Self::reconcile_user_on(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(stats)
    }

    /// Repair every stats row that disagrees with the ledger.
    ///
    /// Inserts missing rows for users who have events, fixes drifted totals
    /// and levels, and resets rows for users with no events. Each user is
    /// rebuilt in its own transaction under the row lock. Returns the number
    /// of rows touched.
    pub async fn reconcile_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let drifted = sqlx::query_scalar::<_, DbId>(
            "WITH ledger AS ( \
                 SELECT user_id, SUM(xp)::BIGINT AS total_xp \
                 FROM xp_events GROUP BY user_id \
             ) \
             SELECT COALESCE(l.user_id, s.user_id) AS user_id \
             FROM ledger l \
             FULL OUTER JOIN user_stats s ON s.user_id = l.user_id \
             WHERE s.user_id IS NULL \
                OR s.total_xp <> COALESCE(l.total_xp, 0) \
                OR s.level <> (COALESCE(l.total_xp, 0) / $1 + 1)::INTEGER \
             ORDER BY 1",
        )
        .bind(XP_PER_LEVEL)
        .fetch_all(pool)
        .await?;

        let mut touched = 0;
        for user_id in drifted {
            let mut tx = pool.begin().await?;
            let (_, changed) = Self::rebuild_locked(&mut *tx, user_id).await?;
            tx.commit().await?;
            if changed {
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Lock the user's stats row, then overwrite it with the ledger sum.
    ///
    /// The sum is read only after the lock is granted, so under READ
    /// COMMITTED it sees every increment committed before us. Returns the row
    /// and whether anything was written.
    async fn rebuild_locked(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<(UserStats, bool), sqlx::Error> {
        let created = sqlx::query(
            "INSERT INTO user_stats (user_id, total_xp, level) VALUES ($1, 0, 1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected()
            > 0;

        let query = format!("SELECT {COLUMNS} FROM user_stats WHERE user_id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, UserStats>(&query)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        let ledger_total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(xp), 0)::BIGINT FROM xp_events WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        let query = format!(
            "UPDATE user_stats SET \
                 total_xp = $2, \
                 level = ($2 / $3 + 1)::INTEGER \
             WHERE user_id = $1 \
               AND (total_xp <> $2 OR level <> ($2 / $3 + 1)::INTEGER) \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, UserStats>(&query)
            .bind(user_id)
            .bind(ledger_total)
            .bind(XP_PER_LEVEL)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(match updated {
            Some(stats) => (stats, true),
            None => (current, created),
        })
    }
}
