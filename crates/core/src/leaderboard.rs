//! Privacy-gated leaderboard ranking.
//!
//! Ranking works on snapshots the caller loads from the store. Public
//! leaderboards only include users who explicitly opted in; a user's own rank
//! is computed over everyone regardless of opt-in.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::leveling::level_for;
use crate::types::DbId;

/// Display name used when an opted-in user has no usable name.
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous Homesteader";

/// Default leaderboard size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// Hard cap on leaderboard size.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// A user's XP total as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub user_id: DbId,
    pub total_xp: i64,
}

/// A user's leaderboard visibility preference as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilitySnapshot {
    pub user_id: DbId,
    pub show_on_leaderboard: bool,
    pub display_name: Option<String>,
}

/// One row of a computed leaderboard. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: DbId,
    pub display_name: String,
    pub total_xp: i64,
    pub level: i32,
    /// 1-based position.
    pub rank: i64,
}

/// Validate a requested leaderboard size.
pub fn validate_limit(limit: i64) -> Result<(), CoreError> {
    if limit < 1 {
        return Err(CoreError::Validation(format!(
            "limit must be at least 1, got {limit}"
        )));
    }
    Ok(())
}

/// Sort stats by `total_xp` descending. The sort is stable, so equal totals
/// keep their input order.
fn sort_by_xp_desc(stats: &mut [StatsSnapshot]) {
    stats.sort_by(|a, b| b.total_xp.cmp(&a.total_xp));
}

/// Build the public leaderboard.
///
/// Only users with a visibility row where `show_on_leaderboard` is true are
/// included; users without a row are excluded. Returns an empty list when
/// nobody has opted in.
pub fn build_leaderboard(
    stats: &[StatsSnapshot],
    visibility: &[VisibilitySnapshot],
    limit: i64,
) -> Result<Vec<LeaderboardEntry>, CoreError> {
    validate_limit(limit)?;

    let opted_in: HashMap<DbId, Option<&str>> = visibility
        .iter()
        .filter(|v| v.show_on_leaderboard)
        .map(|v| (v.user_id, v.display_name.as_deref()))
        .collect();

    let mut candidates: Vec<StatsSnapshot> = stats
        .iter()
        .filter(|s| opted_in.contains_key(&s.user_id))
        .cloned()
        .collect();
    sort_by_xp_desc(&mut candidates);

    let take = usize::try_from(limit).unwrap_or(usize::MAX);

    candidates
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(index, s)| {
            let display_name = opted_in
                .get(&s.user_id)
                .copied()
                .flatten()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(ANONYMOUS_DISPLAY_NAME)
                .to_string();
            Ok(LeaderboardEntry {
                user_id: s.user_id,
                display_name,
                total_xp: s.total_xp,
                level: level_for(s.total_xp)?,
                rank: index as i64 + 1,
            })
        })
        .collect()
}

/// 1-based rank of `user_id` among all users, ignoring opt-in.
///
/// Returns `None` when the user has no stats row.
pub fn user_rank(stats: &[StatsSnapshot], user_id: DbId) -> Option<i64> {
    let mut ranked = stats.to_vec();
    sort_by_xp_desc(&mut ranked);
    ranked
        .iter()
        .position(|s| s.user_id == user_id)
        .map(|index| index as i64 + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(user_id: DbId, total_xp: i64) -> StatsSnapshot {
        StatsSnapshot { user_id, total_xp }
    }

    fn visible(user_id: DbId, name: &str) -> VisibilitySnapshot {
        VisibilitySnapshot {
            user_id,
            show_on_leaderboard: true,
            display_name: Some(name.to_string()),
        }
    }

    fn hidden(user_id: DbId) -> VisibilitySnapshot {
        VisibilitySnapshot {
            user_id,
            show_on_leaderboard: false,
            display_name: Some("hidden".to_string()),
        }
    }

    #[test]
    fn two_opted_in_users_are_ranked_by_xp() {
        let board = build_leaderboard(
            &[stats(2, 150), stats(1, 300)],
            &[visible(1, "Ada"), visible(2, "Ben")],
            10,
        )
        .unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!((board[0].rank, board[0].total_xp), (1, 300));
        assert_eq!((board[1].rank, board[1].total_xp), (2, 150));
        assert_eq!(board[0].display_name, "Ada");
        assert_eq!(board[0].level, 4);
    }

    #[test]
    fn users_without_opt_in_are_excluded() {
        let board = build_leaderboard(
            &[stats(1, 900), stats(2, 500), stats(3, 100)],
            &[hidden(1), visible(3, "Cy")],
            10,
        )
        .unwrap();

        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, 3);
        assert_eq!(board[0].rank, 1);
    }

    #[test]
    fn nobody_opted_in_yields_empty() {
        let board = build_leaderboard(&[stats(1, 10)], &[], 5).unwrap();
        assert!(board.is_empty());
    }

    #[test]
    fn truncates_to_limit() {
        let all: Vec<_> = (1..=20).map(|id| stats(id, id * 10)).collect();
        let vis: Vec<_> = (1..=20).map(|id| visible(id, "x")).collect();
        let board = build_leaderboard(&all, &vis, 3).unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].user_id, 20);
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn ranks_increase_while_xp_does_not() {
        let all = [stats(1, 40), stats(2, 400), stats(3, 40), stats(4, 90)];
        let vis = [visible(1, "a"), visible(2, "b"), visible(3, "c"), visible(4, "d")];
        let board = build_leaderboard(&all, &vis, 10).unwrap();
        for pair in board.windows(2) {
            assert!(pair[0].rank < pair[1].rank);
            assert!(pair[0].total_xp >= pair[1].total_xp);
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let board = build_leaderboard(
            &[stats(5, 100), stats(3, 100), stats(9, 100)],
            &[visible(3, "c"), visible(5, "e"), visible(9, "i")],
            10,
        )
        .unwrap();
        let order: Vec<_> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![5, 3, 9]);
    }

    #[test]
    fn missing_or_blank_display_name_falls_back() {
        let vis = [
            VisibilitySnapshot {
                user_id: 1,
                show_on_leaderboard: true,
                display_name: None,
            },
            visible(2, "   "),
        ];
        let board = build_leaderboard(&[stats(1, 5), stats(2, 3)], &vis, 10).unwrap();
        assert!(board
            .iter()
            .all(|e| e.display_name == ANONYMOUS_DISPLAY_NAME));
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            build_leaderboard(&[], &[], 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn user_rank_ignores_opt_in() {
        let all = [stats(1, 300), stats(2, 150), stats(3, 700)];
        assert_eq!(user_rank(&all, 3), Some(1));
        assert_eq!(user_rank(&all, 1), Some(2));
        assert_eq!(user_rank(&all, 2), Some(3));
    }

    #[test]
    fn user_rank_without_stats_is_none() {
        assert_eq!(user_rank(&[stats(1, 10)], 42), None);
        assert_eq!(user_rank(&[], 1), None);
    }
}
