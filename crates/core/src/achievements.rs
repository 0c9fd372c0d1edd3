//! Achievement catalog and evaluation.
//!
//! The catalog is static and compiled in. Evaluation is a pure function over
//! [`ActivityCounters`] supplied by the caller (who aggregates them from the
//! ledger). Unlocks are monotonic: ids the caller reports as already unlocked
//! are always carried into the result, whatever the counters say now.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::leveling::level_for;
use crate::types::DbId;
use crate::xp::{
    ACTION_ANIMAL_ADDED, ACTION_CROP_PLANTED, ACTION_HARVEST_LOGGED, ACTION_JOURNAL_ENTRY_ADDED,
    ACTION_PROJECT_COMPLETED, ACTION_PROPERTY_ADDED, ACTION_TRANSACTION_LOGGED,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Derived counter holding the user's ledger total.
pub const COUNTER_TOTAL_XP: &str = "total_xp";

/// Derived counter holding the longest daily check-in streak.
pub const COUNTER_LOGIN_STREAK: &str = "login_streak";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Predicate deciding whether an achievement is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum UnlockCondition {
    /// `counters[counter] >= threshold`.
    CounterAtLeast {
        counter: &'static str,
        threshold: i64,
    },
    /// The level derived from the `total_xp` counter is at least `level`.
    LevelAtLeast { level: i32 },
}

impl UnlockCondition {
    pub fn is_met(&self, counters: &ActivityCounters) -> bool {
        match *self {
            Self::CounterAtLeast { counter, threshold } => counters.get(counter) >= threshold,
            Self::LevelAtLeast { level } => level_for(counters.get(COUNTER_TOTAL_XP))
                .map(|current| current >= level)
                .unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// A catalog entry. Defined by the system, never by users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub tier: AchievementTier,
    pub unlock_condition: UnlockCondition,
}

/// Cumulative activity counts keyed by action tag or derived counter name.
///
/// Missing counters read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityCounters(BTreeMap<String, i64>);

impl ActivityCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, counter: impl Into<String>, value: i64) -> Self {
        self.set(counter, value);
        self
    }

    pub fn set(&mut self, counter: impl Into<String>, value: i64) {
        self.0.insert(counter.into(), value);
    }

    pub fn get(&self, counter: &str) -> i64 {
        self.0.get(counter).copied().unwrap_or(0)
    }
}

impl FromIterator<(String, i64)> for ActivityCounters {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of one evaluation pass for a user.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub user_id: DbId,
    /// Every achievement id the user holds after this pass.
    pub unlocked: BTreeSet<String>,
    /// Catalog entries unlocked by this pass that were not held before.
    pub newly_unlocked: Vec<&'static Achievement>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

const fn counter(counter: &'static str, threshold: i64) -> UnlockCondition {
    UnlockCondition::CounterAtLeast { counter, threshold }
}

pub static CATALOG: &[Achievement] = &[
    Achievement {
        id: "first_property",
        name: "Land Owner",
        description: "Add your first property",
        icon: "home",
        tier: AchievementTier::Bronze,
        unlock_condition: counter(ACTION_PROPERTY_ADDED, 1),
    },
    Achievement {
        id: "first_animal",
        name: "Animal Friend",
        description: "Add your first animal",
        icon: "paw-print",
        tier: AchievementTier::Bronze,
        unlock_condition: counter(ACTION_ANIMAL_ADDED, 1),
    },
    Achievement {
        id: "growing_herd",
        name: "Growing Herd",
        description: "Add 10 animals",
        icon: "paw-print",
        tier: AchievementTier::Silver,
        unlock_condition: counter(ACTION_ANIMAL_ADDED, 10),
    },
    Achievement {
        id: "first_crop",
        name: "First Seed",
        description: "Plant your first crop",
        icon: "sprout",
        tier: AchievementTier::Bronze,
        unlock_condition: counter(ACTION_CROP_PLANTED, 1),
    },
    Achievement {
        id: "green_thumb",
        name: "Green Thumb",
        description: "Plant 25 crops",
        icon: "sprout",
        tier: AchievementTier::Silver,
        unlock_condition: counter(ACTION_CROP_PLANTED, 25),
    },
    Achievement {
        id: "first_harvest",
        name: "First Harvest",
        description: "Log your first harvest",
        icon: "wheat",
        tier: AchievementTier::Bronze,
        unlock_condition: counter(ACTION_HARVEST_LOGGED, 1),
    },
    Achievement {
        id: "bountiful_harvest",
        name: "Bountiful Harvest",
        description: "Log 50 harvests",
        icon: "wheat",
        tier: AchievementTier::Gold,
        unlock_condition: counter(ACTION_HARVEST_LOGGED, 50),
    },
    Achievement {
        id: "journal_keeper",
        name: "Journal Keeper",
        description: "Write 10 journal entries",
        icon: "book-open",
        tier: AchievementTier::Bronze,
        unlock_condition: counter(ACTION_JOURNAL_ENTRY_ADDED, 10),
    },
    Achievement {
        id: "chronicler",
        name: "Chronicler",
        description: "Write 100 journal entries",
        icon: "book-open",
        tier: AchievementTier::Gold,
        unlock_condition: counter(ACTION_JOURNAL_ENTRY_ADDED, 100),
    },
    Achievement {
        id: "bookkeeper",
        name: "Bookkeeper",
        description: "Log 25 financial transactions",
        icon: "wallet",
        tier: AchievementTier::Silver,
        unlock_condition: counter(ACTION_TRANSACTION_LOGGED, 25),
    },
    Achievement {
        id: "project_finisher",
        name: "Project Finisher",
        description: "Complete 5 infrastructure projects",
        icon: "hammer",
        tier: AchievementTier::Silver,
        unlock_condition: counter(ACTION_PROJECT_COMPLETED, 5),
    },
    Achievement {
        id: "week_streak",
        name: "Steady Hands",
        description: "Check in 7 days in a row",
        icon: "flame",
        tier: AchievementTier::Silver,
        unlock_condition: counter(COUNTER_LOGIN_STREAK, 7),
    },
    Achievement {
        id: "dedicated_homesteader",
        name: "Dedicated Homesteader",
        description: "Check in 30 days in a row",
        icon: "flame",
        tier: AchievementTier::Gold,
        unlock_condition: counter(COUNTER_LOGIN_STREAK, 30),
    },
    Achievement {
        id: "level_5",
        name: "Seasoned",
        description: "Reach level 5",
        icon: "star",
        tier: AchievementTier::Bronze,
        unlock_condition: UnlockCondition::LevelAtLeast { level: 5 },
    },
    Achievement {
        id: "level_10",
        name: "Master Homesteader",
        description: "Reach level 10",
        icon: "trophy",
        tier: AchievementTier::Gold,
        unlock_condition: UnlockCondition::LevelAtLeast { level: 10 },
    },
    Achievement {
        id: "level_25",
        name: "Legend of the Land",
        description: "Reach level 25",
        icon: "crown",
        tier: AchievementTier::Platinum,
        unlock_condition: UnlockCondition::LevelAtLeast { level: 25 },
    },
];

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Ids of every catalog entry whose condition holds for `counters`.
pub fn unlocked_ids(counters: &ActivityCounters) -> BTreeSet<String> {
    CATALOG
        .iter()
        .filter(|a| a.unlock_condition.is_met(counters))
        .map(|a| a.id.to_string())
        .collect()
}

/// Evaluate the catalog for a user.
///
/// `previously_unlocked` is what the store already holds for the user. It is
/// unioned into the result and never re-checked, so a pass can only add ids.
/// Running this twice with the same inputs yields the same output, which
/// makes it safe to re-run after a partially persisted pass.
pub fn evaluate(
    user_id: DbId,
    counters: &ActivityCounters,
    previously_unlocked: &BTreeSet<String>,
) -> Evaluation {
    let met = unlocked_ids(counters);
    let newly_unlocked: Vec<&'static Achievement> = CATALOG
        .iter()
        .filter(|a| met.contains(a.id) && !previously_unlocked.contains(a.id))
        .collect();

    let mut unlocked = previously_unlocked.clone();
    unlocked.extend(newly_unlocked.iter().map(|a| a.id.to_string()));

    Evaluation {
        user_id,
        unlocked,
        newly_unlocked,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn catalog_ids_are_unique() {
        let all: BTreeSet<&str> = CATALOG.iter().map(|a| a.id).collect();
        assert_eq!(all.len(), CATALOG.len());
    }

    #[test]
    fn empty_counters_unlock_nothing() {
        let eval = evaluate(1, &ActivityCounters::new(), &BTreeSet::new());
        assert!(eval.unlocked.is_empty());
        assert!(eval.newly_unlocked.is_empty());
    }

    #[test]
    fn counter_threshold_unlocks() {
        let counters = ActivityCounters::new().with(ACTION_ANIMAL_ADDED, 10);
        let eval = evaluate(1, &counters, &BTreeSet::new());
        assert_eq!(eval.unlocked, ids(&["first_animal", "growing_herd"]));
        assert_eq!(eval.newly_unlocked.len(), 2);
    }

    #[test]
    fn level_condition_reads_total_xp() {
        let counters = ActivityCounters::new().with(COUNTER_TOTAL_XP, 399);
        assert!(!unlocked_ids(&counters).contains("level_5"));

        let counters = ActivityCounters::new().with(COUNTER_TOTAL_XP, 400);
        assert!(unlocked_ids(&counters).contains("level_5"));
    }

    #[test]
    fn negative_total_xp_never_unlocks_levels() {
        let counters = ActivityCounters::new().with(COUNTER_TOTAL_XP, -500);
        assert!(unlocked_ids(&counters).is_empty());
    }

    #[test]
    fn evaluation_is_idempotent() {
        let counters = ActivityCounters::new()
            .with(ACTION_CROP_PLANTED, 3)
            .with(COUNTER_LOGIN_STREAK, 8);
        let first = evaluate(7, &counters, &BTreeSet::new());
        let second = evaluate(7, &counters, &BTreeSet::new());
        assert_eq!(first.unlocked, second.unlocked);

        // Feeding the result back in yields nothing new.
        let third = evaluate(7, &counters, &first.unlocked);
        assert_eq!(third.unlocked, first.unlocked);
        assert!(third.newly_unlocked.is_empty());
    }

    #[test]
    fn previously_unlocked_ids_are_never_removed() {
        let previous = ids(&["growing_herd", "week_streak"]);
        let counters = ActivityCounters::new().with(ACTION_ANIMAL_ADDED, 1);
        let eval = evaluate(3, &counters, &previous);

        assert!(eval.unlocked.is_superset(&previous));
        assert!(eval.unlocked.contains("first_animal"));
        assert_eq!(eval.newly_unlocked.len(), 1);
        assert_eq!(eval.newly_unlocked[0].id, "first_animal");
    }

    #[test]
    fn unlocks_are_monotonic_with_growing_counters() {
        let mut held = BTreeSet::new();
        for n in 0..40 {
            let counters = ActivityCounters::new()
                .with(ACTION_CROP_PLANTED, n)
                .with(COUNTER_TOTAL_XP, n * 50);
            let eval = evaluate(9, &counters, &held);
            assert!(eval.unlocked.is_superset(&held));
            held = eval.unlocked;
        }
        assert!(held.contains("green_thumb"));
        assert!(held.contains("level_10"));
    }

    #[test]
    fn counters_collect_from_pairs() {
        let counters: ActivityCounters = vec![("animal_added".to_string(), 4)]
            .into_iter()
            .collect();
        assert_eq!(counters.get("animal_added"), 4);
        assert_eq!(counters.get("crop_planted"), 0);
    }
}
