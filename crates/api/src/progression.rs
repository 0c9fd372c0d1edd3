//! The progression facade.
//!
//! [`ProgressionService`] is the only entry point handlers use to touch XP,
//! levels, achievements, and the leaderboard. It validates input with the pure
//! functions in `homestead_core`, runs every store call under the configured
//! timeout, and decides which failures surface and which degrade.
//!
//! Degrading reads (recent events, achievement list, leaderboard) log at
//! `warn` and return an empty list. Writes and rank lookups propagate.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use homestead_core::achievements::{
    self, Achievement, ActivityCounters, Evaluation, CATALOG, COUNTER_LOGIN_STREAK,
    COUNTER_TOTAL_XP,
};
use homestead_core::error::CoreError;
use homestead_core::leaderboard::{self, LeaderboardEntry, StatsSnapshot};
use homestead_core::leveling::{level_for, progress_within_level, LevelProgress};
use homestead_core::pagination::{clamp_limit, DEFAULT_EVENT_LIMIT, MAX_EVENT_LIMIT};
use homestead_core::streak::longest_daily_streak;
use homestead_core::types::{DbId, Timestamp};
use homestead_core::xp::{self, ACTION_DAILY_LOGIN};
use homestead_db::models::privacy::{UpsertPrivacySettings, UserPrivacySettings};
use homestead_db::models::user_stats::UserStats;
use homestead_db::models::xp_event::{CreateXpEvent, XpEvent};
use homestead_db::repositories::{
    PrivacySettingsRepo, UserAchievementRepo, UserStatsRepo, XpEventRepo,
};
use homestead_db::DbPool;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Inputs and views
// ---------------------------------------------------------------------------

/// A qualifying homestead action reported by an authenticated end user.
///
/// Carries no XP amount: the award always comes from the reward table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordAction {
    pub action: String,
    pub metadata: Option<serde_json::Value>,
    /// Retries carrying the same key are recorded once.
    pub idempotency_key: Option<String>,
}

/// A qualifying action reported by trusted in-process code, which may set
/// the award explicitly.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    pub action: String,
    /// Explicit award. Omit to use the action's default from the reward table.
    pub xp: Option<i32>,
    pub metadata: Option<serde_json::Value>,
    /// Retries carrying the same key are recorded once.
    pub idempotency_key: Option<String>,
}

/// Cached stats together with the derived level breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub user_id: DbId,
    pub total_xp: i64,
    pub level: i32,
    pub progress: LevelProgress,
}

impl StatsView {
    fn from_total(user_id: DbId, total_xp: i64) -> Result<Self, CoreError> {
        let progress = progress_within_level(total_xp)?;
        Ok(Self {
            user_id,
            total_xp,
            level: progress.level,
            progress,
        })
    }

    fn from_stats(stats: &UserStats) -> Result<Self, CoreError> {
        Self::from_total(stats.user_id, stats.total_xp)
    }
}

/// Everything a caller learns from recording one action.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionUpdate {
    pub event: XpEvent,
    pub stats: StatsView,
    /// True when the idempotency key matched an earlier event.
    pub duplicate: bool,
    pub leveled_up: bool,
    pub previous_level: i32,
    pub newly_unlocked: Vec<&'static Achievement>,
}

/// Result of an explicit evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementEvaluation {
    pub counters: ActivityCounters,
    pub unlocked: BTreeSet<String>,
    pub newly_unlocked: Vec<&'static Achievement>,
}

/// A catalog entry annotated with the user's unlock state.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: &'static Achievement,
    pub unlocked: bool,
    pub unlocked_at: Option<Timestamp>,
}

/// A user's own position over all users, opted in or not.
#[derive(Debug, Clone, Serialize)]
pub struct RankView {
    pub user_id: DbId,
    pub rank: i64,
    pub total_xp: i64,
    pub level: i32,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Orchestrates the ledger, level calculator, evaluator, and ranker.
#[derive(Clone)]
pub struct ProgressionService {
    pool: DbPool,
    store_timeout: Duration,
    leaderboard_default_limit: i64,
    leaderboard_max_limit: i64,
}

impl ProgressionService {
    pub fn new(
        pool: DbPool,
        store_timeout: Duration,
        leaderboard_default_limit: i64,
        leaderboard_max_limit: i64,
    ) -> Self {
        Self {
            pool,
            store_timeout,
            leaderboard_default_limit,
            leaderboard_max_limit,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            Duration::from_secs(state.config.store_timeout_secs),
            state.config.leaderboard_default_limit,
            state.config.leaderboard_max_limit,
        )
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::StoreTimeout(operation)),
        }
    }

    // -- Ledger --------------------------------------------------------------

    /// Record an action reported by an end user.
    ///
    /// Only actions listed in the reward table are accepted, at their table
    /// value. Explicit amounts and unlisted actions are reserved for
    /// [`Self::record_event`].
    pub async fn record_action(
        &self,
        user_id: DbId,
        input: RecordAction,
    ) -> AppResult<ProgressionUpdate> {
        xp::reward_for(&input.action)?;
        self.record_event(
            user_id,
            RecordEvent {
                action: input.action,
                xp: None,
                metadata: input.metadata,
                idempotency_key: input.idempotency_key,
            },
        )
        .await
    }

    /// Record a qualifying action and fold it into stats and achievements.
    ///
    /// Trusts the caller with explicit amounts and unlisted action tags, so
    /// it is not reachable from HTTP. The ledger insert and the stats increment commit together. Achievement
    /// evaluation then runs to completion before this returns. If evaluation
    /// fails the event stays recorded and the error propagates; retrying with
    /// the same idempotency key re-runs evaluation without awarding twice.
    pub async fn record_event(
        &self,
        user_id: DbId,
        input: RecordEvent,
    ) -> AppResult<ProgressionUpdate> {
        xp::validate_action(&input.action)?;
        let amount = xp::resolve_xp(&input.action, input.xp)?;
        if let Some(key) = input.idempotency_key.as_deref() {
            xp::validate_idempotency_key(key)?;
        }

        let create = CreateXpEvent {
            user_id,
            action: input.action,
            xp: amount,
            metadata: input.metadata,
            idempotency_key: input.idempotency_key,
        };
        let recorded = self
            .bounded("record_xp_event", XpEventRepo::record(&self.pool, &create))
            .await?;

        let stats = StatsView::from_stats(&recorded.stats)?;
        let previous_level = if recorded.duplicate {
            stats.level
        } else {
            level_for(recorded.stats.total_xp - i64::from(recorded.event.xp))?
        };

        if recorded.duplicate {
            tracing::info!(
                user_id,
                event_id = recorded.event.id,
                action = %recorded.event.action,
                "Duplicate XP event ignored",
            );
        } else {
            tracing::info!(
                user_id,
                event_id = recorded.event.id,
                action = %recorded.event.action,
                xp = recorded.event.xp,
                total_xp = stats.total_xp,
                level = stats.level,
                "XP awarded",
            );
        }

        let evaluation = self.evaluate_achievements(user_id).await?;

        Ok(ProgressionUpdate {
            event: recorded.event,
            leveled_up: stats.level > previous_level,
            previous_level,
            stats,
            duplicate: recorded.duplicate,
            newly_unlocked: evaluation.newly_unlocked,
        })
    }

    /// Award the daily login bonus for `today`. Repeat calls on the same UTC
    /// day return the first check-in as a duplicate.
    pub async fn check_in(&self, user_id: DbId, today: NaiveDate) -> AppResult<ProgressionUpdate> {
        self.record_event(
            user_id,
            RecordEvent {
                action: ACTION_DAILY_LOGIN.to_string(),
                xp: None,
                metadata: Some(serde_json::json!({ "day": today.format("%Y-%m-%d").to_string() })),
                idempotency_key: Some(xp::daily_login_key(today)),
            },
        )
        .await
    }

    /// Most recent ledger events for a user, newest first.
    pub async fn recent_events(&self, user_id: DbId, limit: Option<i64>) -> Vec<XpEvent> {
        let limit = clamp_limit(limit, DEFAULT_EVENT_LIMIT, MAX_EVENT_LIMIT);
        let result = self
            .bounded(
                "list_recent_xp_events",
                XpEventRepo::list_recent(&self.pool, user_id, limit),
            )
            .await;
        degrade("recent_events", result)
    }

    // -- Stats ---------------------------------------------------------------

    /// Current stats for a user. A user with no events reads as 0 XP, level 1.
    ///
    /// A cached row whose level disagrees with its total, or a missing row
    /// for a user who has ledger events, is rebuilt from the ledger before
    /// returning.
    pub async fn stats(&self, user_id: DbId) -> AppResult<StatsView> {
        let found = self
            .bounded("find_user_stats", UserStatsRepo::find(&self.pool, user_id))
            .await?;

        match found {
            None => {
                let ledger_total = self
                    .bounded("sum_xp_events", XpEventRepo::total_xp(&self.pool, user_id))
                    .await?;
                if ledger_total == 0 {
                    return Ok(StatsView::from_total(user_id, 0)?);
                }
                tracing::warn!(
                    user_id,
                    ledger_total,
                    "Stats row missing for user with events, reconciling",
                );
            }
            Some(row) if row.level == level_for(row.total_xp)? => {
                return Ok(StatsView::from_stats(&row)?);
            }
            Some(row) => {
                tracing::warn!(
                    user_id,
                    total_xp = row.total_xp,
                    level = row.level,
                    "Cached level disagrees with total, reconciling",
                );
            }
        }

        let repaired = self
            .bounded(
                "reconcile_user_stats",
                UserStatsRepo::reconcile_user(&self.pool, user_id),
            )
            .await?;
        Ok(StatsView::from_stats(&repaired)?)
    }

    // -- Achievements --------------------------------------------------------

    /// Aggregate a user's counters fresh from the ledger. Counts, total and
    /// login days come from one snapshot so they always agree.
    pub async fn activity_counters(&self, user_id: DbId) -> AppResult<ActivityCounters> {
        let snapshot = self
            .bounded(
                "snapshot_xp_activity",
                XpEventRepo::activity_snapshot(&self.pool, user_id, ACTION_DAILY_LOGIN),
            )
            .await?;

        let mut counters: ActivityCounters = snapshot
            .counts
            .into_iter()
            .map(|row| (row.action, row.count))
            .collect();
        counters.set(COUNTER_TOTAL_XP, snapshot.total_xp);
        counters.set(
            COUNTER_LOGIN_STREAK,
            longest_daily_streak(&snapshot.streak_days),
        );
        Ok(counters)
    }

    /// Evaluate the catalog against fresh counters and persist new unlocks.
    ///
    /// Only unlocks this call actually inserted are reported as new, so two
    /// overlapping passes never both announce the same achievement.
    pub async fn evaluate_achievements(&self, user_id: DbId) -> AppResult<AchievementEvaluation> {
        let counters = self.activity_counters(user_id).await?;
        let held = self
            .bounded(
                "list_user_achievements",
                UserAchievementRepo::list_for_user(&self.pool, user_id),
            )
            .await?;
        let previously_unlocked: BTreeSet<String> =
            held.into_iter().map(|row| row.achievement_id).collect();

        let Evaluation {
            unlocked,
            newly_unlocked,
            ..
        } = achievements::evaluate(user_id, &counters, &previously_unlocked);

        if newly_unlocked.is_empty() {
            return Ok(AchievementEvaluation {
                counters,
                unlocked,
                newly_unlocked,
            });
        }

        let ids: Vec<&str> = newly_unlocked.iter().map(|a| a.id).collect();
        let inserted = self
            .bounded(
                "unlock_achievements",
                UserAchievementRepo::unlock_many(&self.pool, user_id, &ids),
            )
            .await?;
        let inserted_ids: BTreeSet<&str> =
            inserted.iter().map(|row| row.achievement_id.as_str()).collect();
        let newly_unlocked: Vec<&'static Achievement> = newly_unlocked
            .into_iter()
            .filter(|a| inserted_ids.contains(a.id))
            .collect();

        for achievement in &newly_unlocked {
            tracing::info!(
                user_id,
                achievement_id = achievement.id,
                tier = ?achievement.tier,
                "Achievement unlocked",
            );
        }

        Ok(AchievementEvaluation {
            counters,
            unlocked,
            newly_unlocked,
        })
    }

    /// The full catalog with the user's unlock state, in catalog order.
    pub async fn achievements(&self, user_id: DbId) -> Vec<AchievementStatus> {
        let result = self
            .bounded(
                "list_user_achievements",
                UserAchievementRepo::list_for_user(&self.pool, user_id),
            )
            .await;
        let Some(held) = degrade_opt("achievements", result) else {
            return Vec::new();
        };

        let unlocked_at: HashMap<&str, Timestamp> = held
            .iter()
            .map(|row| (row.achievement_id.as_str(), row.unlocked_at))
            .collect();

        CATALOG
            .iter()
            .map(|achievement| {
                let at = unlocked_at.get(achievement.id).copied();
                AchievementStatus {
                    achievement,
                    unlocked: at.is_some(),
                    unlocked_at: at,
                }
            })
            .collect()
    }

    // -- Leaderboard ---------------------------------------------------------

    /// The public leaderboard. `None` uses the configured default size and
    /// larger requests are capped at the configured maximum.
    pub async fn leaderboard(&self, limit: Option<i64>) -> AppResult<Vec<LeaderboardEntry>> {
        let limit = match limit {
            None => self.leaderboard_default_limit,
            Some(requested) => {
                leaderboard::validate_limit(requested)?;
                requested.min(self.leaderboard_max_limit)
            }
        };

        let opted_in = self
            .bounded(
                "list_opted_in_privacy_settings",
                PrivacySettingsRepo::list_opted_in(&self.pool),
            )
            .await;
        let Some(opted_in) = degrade_opt("leaderboard", opted_in) else {
            return Ok(Vec::new());
        };
        if opted_in.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<DbId> = opted_in.iter().map(|p| p.user_id).collect();
        let stats = self
            .bounded(
                "list_stats_for_users",
                UserStatsRepo::list_for_users(&self.pool, &user_ids),
            )
            .await;
        let Some(stats) = degrade_opt("leaderboard", stats) else {
            return Ok(Vec::new());
        };

        let stats: Vec<StatsSnapshot> = stats.iter().map(UserStats::snapshot).collect();
        let visibility: Vec<_> = opted_in.iter().map(UserPrivacySettings::snapshot).collect();
        Ok(leaderboard::build_leaderboard(&stats, &visibility, limit)?)
    }

    /// The caller's rank among every user with stats.
    pub async fn user_rank(&self, user_id: DbId) -> AppResult<RankView> {
        let all = self
            .bounded("list_all_user_stats", UserStatsRepo::list_all(&self.pool))
            .await?;
        let snapshots: Vec<StatsSnapshot> = all.iter().map(UserStats::snapshot).collect();

        let rank = leaderboard::user_rank(&snapshots, user_id).ok_or(CoreError::NotFound {
            entity: "UserStats",
            id: user_id,
        })?;
        let total_xp = snapshots
            .iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.total_xp)
            .unwrap_or(0);

        Ok(RankView {
            user_id,
            rank,
            total_xp,
            level: level_for(total_xp)?,
        })
    }

    // -- Privacy -------------------------------------------------------------

    pub async fn privacy(&self, user_id: DbId) -> AppResult<Option<UserPrivacySettings>> {
        self.bounded(
            "find_privacy_settings",
            PrivacySettingsRepo::find(&self.pool, user_id),
        )
        .await
    }

    /// Create or replace the caller's leaderboard visibility. The display
    /// name is trimmed and must not be blank.
    pub async fn update_privacy(
        &self,
        user_id: DbId,
        input: UpsertPrivacySettings,
    ) -> AppResult<UserPrivacySettings> {
        let input = UpsertPrivacySettings {
            display_name: input.display_name.trim().to_string(),
            ..input
        };
        input
            .validate()
            .map_err(|e| CoreError::Validation(format!("Invalid privacy settings: {e}")))?;

        let saved = self
            .bounded(
                "upsert_privacy_settings",
                PrivacySettingsRepo::upsert(&self.pool, user_id, &input),
            )
            .await?;

        tracing::info!(
            user_id,
            show_on_leaderboard = saved.show_on_leaderboard,
            "Privacy settings updated",
        );
        Ok(saved)
    }
}

// ---------------------------------------------------------------------------
// Degradation helpers
// ---------------------------------------------------------------------------

fn degrade_opt<T>(operation: &'static str, result: AppResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation, error = %e, "Store read failed, degrading to empty");
            None
        }
    }
}

fn degrade<T: Default>(operation: &'static str, result: AppResult<T>) -> T {
    degrade_opt(operation, result).unwrap_or_default()
}
