//! Repository for the append-only `xp_events` ledger.

use chrono::NaiveDate;
use homestead_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::xp_event::{
    ActionCount, ActivitySnapshot, CreateXpEvent, RecordedXpEvent, XpEvent,
};
use crate::repositories::UserStatsRepo;

/// Column list for `xp_events` queries.
const COLUMNS: &str = "id, user_id, action, xp, metadata, idempotency_key, created_at";

/// Provides append and read operations on the XP ledger.
pub struct XpEventRepo;

impl XpEventRepo {
    /// Append an event and fold it into the user's stats in one transaction.
    ///
    /// When `idempotency_key` is set and an event with the same key already
    /// exists for the user, nothing is written: the existing event is
    /// returned with `duplicate = true` together with the current stats.
    pub async fn record(
        pool: &PgPool,
        input: &CreateXpEvent,
    ) -> Result<RecordedXpEvent, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let inserted = Self::insert_on(&mut *tx, input).await?;

        let recorded = match inserted {
            Some(event) => {
                let stats =
                    UserStatsRepo::increment(&mut *tx, input.user_id, i64::from(event.xp)).await?;
                RecordedXpEvent {
                    event,
                    stats,
                    duplicate: false,
                }
            }
            None => {
                // Only reachable with a key: NULL keys never conflict.
                let key = input.idempotency_key.as_deref().unwrap_or_default();
                let event = Self::find_by_idempotency_key_on(&mut *tx, input.user_id, key)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                let stats = match UserStatsRepo::find_on(&mut *tx, input.user_id).await? {
                    Some(stats) => stats,
                    None => UserStatsRepo::reconcile_user_on(&mut *tx, input.user_id).await?,
                };
                RecordedXpEvent {
                    event,
                    stats,
                    duplicate: true,
                }
            }
        };

        tx.commit().await?;
        Ok(recorded)
    }

    /// Insert a ledger row, skipping it if the idempotency key is taken.
    async fn insert_on(
        conn: &mut PgConnection,
        input: &CreateXpEvent,
    ) -> Result<Option<XpEvent>, sqlx::Error> {
        let query = format!(
            "INSERT INTO xp_events (user_id, action, xp, metadata, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, idempotency_key) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, XpEvent>(&query)
            .bind(input.user_id)
            .bind(&input.action)
            .bind(input.xp)
            .bind(&input.metadata)
            .bind(&input.idempotency_key)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn find_by_idempotency_key_on(
        conn: &mut PgConnection,
        user_id: DbId,
        key: &str,
    ) -> Result<Option<XpEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM xp_events \
             WHERE user_id = $1 AND idempotency_key = $2"
        );
        sqlx::query_as::<_, XpEvent>(&query)
            .bind(user_id)
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Sum of all XP awarded to a user; 0 when there are no events.
    pub async fn total_xp(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(xp), 0)::BIGINT FROM xp_events WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Most recent events for a user, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<XpEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM xp_events \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, XpEvent>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Per-action counts, ledger total and `streak_action` days for a user,
    /// all read from one consistent snapshot.
    pub async fn activity_snapshot(
        pool: &PgPool,
        user_id: DbId,
        streak_action: &str,
    ) -> Result<ActivitySnapshot, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let counts = Self::count_by_action_on(&mut *tx, user_id).await?;
        let total_xp = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(xp), 0)::BIGINT FROM xp_events WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let streak_days = Self::activity_days_on(&mut *tx, user_id, streak_action).await?;

        tx.commit().await?;
        Ok(ActivitySnapshot {
            counts,
            total_xp,
            streak_days,
        })
    }

    async fn count_by_action_on(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<ActionCount>, sqlx::Error> {
        sqlx::query_as::<_, ActionCount>(
            "SELECT action, COUNT(*)::BIGINT AS count FROM xp_events \
             WHERE user_id = $1 \
             GROUP BY action \
             ORDER BY action",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// Distinct UTC days on which the user recorded `action`, ascending.
    async fn activity_days_on(
        conn: &mut PgConnection,
        user_id: DbId,
        action: &str,
    ) -> Result<Vec<NaiveDate>, sqlx::Error> {
        sqlx::query_scalar::<_, NaiveDate>(
            "SELECT DISTINCT (created_at AT TIME ZONE 'UTC')::DATE AS day \
             FROM xp_events \
             WHERE user_id = $1 AND action = $2 \
             ORDER BY day",
        )
        .bind(user_id)
        .bind(action)
        .fetch_all(&mut *conn)
        .await
    }
}
