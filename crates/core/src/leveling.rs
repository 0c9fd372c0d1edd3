//! Level derivation from total XP.
//!
//! Levels use a fixed-width policy: every level spans exactly
//! [`XP_PER_LEVEL`] points (level 1 is 0-99, level 2 is 100-199, ...).
//! Negative totals are rejected rather than clamped; a negative ledger sum
//! means the data upstream is corrupt.

use serde::Serialize;

use crate::error::CoreError;

/// XP required to advance one level.
pub const XP_PER_LEVEL: i64 = 100;

/// The lowest possible level.
pub const MIN_LEVEL: i32 = 1;

/// Where a user sits inside their current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: i32,
    /// Total XP at which the current level starts.
    pub current_level_base: i64,
    /// XP earned since the current level started, always in `[0, XP_PER_LEVEL)`.
    pub xp_into_level: i64,
    /// Total XP at which the next level starts.
    pub xp_to_next_level: i64,
    /// Percentage through the current level, `0..=100`.
    pub percent: u8,
}

fn ensure_non_negative(total_xp: i64) -> Result<(), CoreError> {
    if total_xp < 0 {
        return Err(CoreError::Validation(format!(
            "total_xp must not be negative, got {total_xp}"
        )));
    }
    Ok(())
}

/// Level for a given XP total: `floor(total_xp / 100) + 1`.
pub fn level_for(total_xp: i64) -> Result<i32, CoreError> {
    ensure_non_negative(total_xp)?;
    let level = total_xp / XP_PER_LEVEL + i64::from(MIN_LEVEL);
    i32::try_from(level)
        .map_err(|_| CoreError::Validation(format!("total_xp {total_xp} is out of range")))
}

/// Break a total down into level, level base, and progress toward the next level.
pub fn progress_within_level(total_xp: i64) -> Result<LevelProgress, CoreError> {
    let level = level_for(total_xp)?;
    let current_level_base = (i64::from(level) - i64::from(MIN_LEVEL)) * XP_PER_LEVEL;
    let xp_into_level = total_xp - current_level_base;
    let xp_to_next_level = i64::from(level) * XP_PER_LEVEL;

    let pct = (xp_into_level as f64 / XP_PER_LEVEL as f64 * 100.0).clamp(0.0, 100.0);

    Ok(LevelProgress {
        level,
        current_level_base,
        xp_into_level,
        xp_to_next_level,
        percent: pct as u8,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
