//! Limit clamping for list endpoints.

/// Default page size for recent-event listings.
pub const DEFAULT_EVENT_LIMIT: i64 = 20;

/// Maximum page size for recent-event listings.
pub const MAX_EVENT_LIMIT: i64 = 200;

/// Clamp a user-provided limit to `[1, max]`, falling back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_default_when_absent() {
        assert_eq!(clamp_limit(None, 20, 200), 20);
    }

    #[test]
    fn clamps_both_ends() {
        assert_eq!(clamp_limit(Some(0), 20, 200), 1);
        assert_eq!(clamp_limit(Some(-3), 20, 200), 1);
        assert_eq!(clamp_limit(Some(5000), 20, 200), 200);
        assert_eq!(clamp_limit(Some(50), 20, 200), 50);
    }
}
