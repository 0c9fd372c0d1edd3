//! Homestead progression domain logic.
//!
//! Everything in this crate is pure: leveling math, XP award validation,
//! the achievement catalog and evaluator, and leaderboard ranking. Callers
//! load data from the store and pass it in; nothing here performs I/O.

pub mod achievements;
pub mod error;
pub mod leaderboard;
pub mod leveling;
pub mod pagination;
pub mod streak;
pub mod types;
pub mod xp;
