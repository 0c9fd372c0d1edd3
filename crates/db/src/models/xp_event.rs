//! XP ledger models and DTOs.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use homestead_core::types::{DbId, Timestamp};

use crate::models::user_stats::UserStats;

/// A row from the `xp_events` table. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct XpEvent {
    pub id: DbId,
    pub user_id: DbId,
    pub action: String,
    pub xp: i32,
    pub metadata: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
    pub created_at: Timestamp,
}

/// Input for appending a ledger event. Validated by the caller.
#[derive(Debug, Clone)]
pub struct CreateXpEvent {
    pub user_id: DbId,
    pub action: String,
    pub xp: i32,
    pub metadata: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
}

/// Per-action event count for one user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActionCount {
    pub action: String,
    pub count: i64,
}

/// Ledger aggregates for one user taken from a single read-only snapshot.
#[derive(Debug, Clone, Default)]
pub struct ActivitySnapshot {
    pub counts: Vec<ActionCount>,
    pub total_xp: i64,
    /// Distinct UTC days with at least one event of the streak action.
    pub streak_days: Vec<NaiveDate>,
}

/// Result of a ledger write together with the stats it produced.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedXpEvent {
    pub event: XpEvent,
    pub stats: UserStats,
    /// True when the idempotency key matched an existing event and nothing
    /// was written.
    pub duplicate: bool,
}
