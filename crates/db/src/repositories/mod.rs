//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or a `&mut PgConnection` when the call must join
//! an outer transaction) as the first argument.

pub mod privacy_settings_repo;
pub mod user_achievement_repo;
pub mod user_stats_repo;
pub mod xp_event_repo;

pub use privacy_settings_repo::PrivacySettingsRepo;
pub use user_achievement_repo::UserAchievementRepo;
pub use user_stats_repo::UserStatsRepo;
pub use xp_event_repo::XpEventRepo;
