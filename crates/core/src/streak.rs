//! Consecutive-day streak computation for daily check-ins.

use chrono::NaiveDate;

/// Length of the longest run of consecutive calendar days in `days`.
///
/// Input order and duplicates do not matter. Returns 0 for an empty slice.
pub fn longest_daily_streak(days: &[NaiveDate]) -> i64 {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut longest = 0i64;
    let mut current = 0i64;
    let mut previous: Option<NaiveDate> = None;

    for day in sorted {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }

    longest
}
