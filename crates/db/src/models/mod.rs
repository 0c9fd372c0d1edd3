//! Row models and DTOs, one module per table.

pub mod privacy;
pub mod user_achievement;
pub mod user_stats;
pub mod xp_event;
