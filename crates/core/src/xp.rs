//! XP award rules for the ledger.
//!
//! Defines the known homestead action tags, the default XP each one is worth,
//! and the validation applied before an event is appended to the ledger.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Action tags
// ---------------------------------------------------------------------------

pub const ACTION_PROPERTY_ADDED: &str = "property_added";
pub const ACTION_ANIMAL_ADDED: &str = "animal_added";
pub const ACTION_CROP_PLANTED: &str = "crop_planted";
pub const ACTION_HARVEST_LOGGED: &str = "harvest_logged";
pub const ACTION_JOURNAL_ENTRY_ADDED: &str = "journal_entry_added";
pub const ACTION_TRANSACTION_LOGGED: &str = "transaction_logged";
pub const ACTION_PROJECT_CREATED: &str = "project_created";
pub const ACTION_PROJECT_COMPLETED: &str = "project_completed";
pub const ACTION_HEALTH_RECORD_ADDED: &str = "health_record_added";
pub const ACTION_DAILY_LOGIN: &str = "daily_login";

/// Default XP per known action.
pub const XP_REWARDS: &[(&str, i32)] = &[
    (ACTION_PROPERTY_ADDED, 25),
    (ACTION_ANIMAL_ADDED, 10),
    (ACTION_CROP_PLANTED, 10),
    (ACTION_HARVEST_LOGGED, 15),
    (ACTION_JOURNAL_ENTRY_ADDED, 5),
    (ACTION_TRANSACTION_LOGGED, 5),
    (ACTION_PROJECT_CREATED, 10),
    (ACTION_PROJECT_COMPLETED, 50),
    (ACTION_HEALTH_RECORD_ADDED, 5),
    (ACTION_DAILY_LOGIN, 5),
];

/// Maximum length of an action tag.
pub const MAX_ACTION_LENGTH: usize = 64;

/// Maximum length of an idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 128;

/// Upper bound on a single award, to catch unit mistakes in callers.
pub const MAX_XP_PER_EVENT: i32 = 10_000;

static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Default XP for a known action, `None` for anything else.
pub fn default_xp_for(action: &str) -> Option<i32> {
    XP_REWARDS
        .iter()
        .find(|(name, _)| *name == action)
        .map(|(_, xp)| *xp)
}

/// Resolve the XP for an award: an explicit amount wins, otherwise the
/// action's default. Unknown actions must carry an explicit amount.
pub fn resolve_xp(action: &str, explicit: Option<i32>) -> Result<i32, CoreError> {
    let xp = match explicit {
        Some(xp) => xp,
        None => default_xp_for(action).ok_or_else(|| {
            CoreError::Validation(format!(
                "Action '{action}' has no default XP; an explicit xp amount is required"
            ))
        })?,
    };
    validate_xp_amount(xp)?;
    Ok(xp)
}

/// XP for an action reported by an end user.
///
/// Only actions in [`XP_REWARDS`] qualify, and always at their table value.
/// The daily login bonus is excluded because it is awarded through the
/// check-in, which keys it to the UTC day.
pub fn reward_for(action: &str) -> Result<i32, CoreError> {
    validate_action(action)?;
    if action == ACTION_DAILY_LOGIN {
        return Err(CoreError::Validation(
            "daily_login is awarded by checking in".into(),
        ));
    }
    default_xp_for(action)
        .ok_or_else(|| CoreError::Validation(format!("Action '{action}' does not award XP")))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// An XP amount must be strictly positive and within [`MAX_XP_PER_EVENT`].
pub fn validate_xp_amount(xp: i32) -> Result<(), CoreError> {
    if xp <= 0 {
        return Err(CoreError::Validation(format!(
            "xp must be a positive integer, got {xp}"
        )));
    }
    if xp > MAX_XP_PER_EVENT {
        return Err(CoreError::Validation(format!(
            "xp must not exceed {MAX_XP_PER_EVENT}, got {xp}"
        )));
    }
    Ok(())
}

/// An action tag must be non-empty lowercase snake_case.
pub fn validate_action(action: &str) -> Result<(), CoreError> {
    if action.is_empty() {
        return Err(CoreError::Validation("action must not be empty".into()));
    }
    if action.len() > MAX_ACTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "action exceeds maximum length of {MAX_ACTION_LENGTH}"
        )));
    }
    if !ACTION_RE.is_match(action) {
        return Err(CoreError::Validation(format!(
            "action '{action}' must contain only lowercase letters, digits, and underscores"
        )));
    }
    Ok(())
}

pub fn validate_idempotency_key(key: &str) -> Result<(), CoreError> {
    if key.trim().is_empty() {
        return Err(CoreError::Validation(
            "idempotency_key must not be blank".into(),
        ));
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err(CoreError::Validation(format!(
            "idempotency_key exceeds maximum length of {MAX_IDEMPOTENCY_KEY_LENGTH}"
        )));
    }
    Ok(())
}

/// Idempotency key for a daily check-in, one per UTC day.
pub fn daily_login_key(day: chrono::NaiveDate) -> String {
    format!("{ACTION_DAILY_LOGIN}:{}", day.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
