//! Derived streak values
//!
//! Pure functions of the current time and the streak state. Days are UTC
//! day indexes: `floor(unix_millis / 86_400_000)`.

/// Milliseconds in one UTC day
pub const MS_PER_DAY: i64 = 86_400_000;

/// Number of flame positions shown
pub const DEFAULT_FLAME_CAPACITY: usize = 10;

/// UTC day index of `now_ms`
pub fn utc_day(now_ms: i64) -> i64 {
    now_ms.div_euclid(MS_PER_DAY)
}

/// Milliseconds until the next check-in is allowed; 0 when allowed now
pub fn derive_countdown(now_ms: i64, last_submission_day: Option<i64>) -> i64 {
    let current_day = utc_day(now_ms);

    match last_submission_day {
        Some(day) if day == current_day => current_day
            .saturating_add(1)
            .saturating_mul(MS_PER_DAY)
            .saturating_sub(now_ms)
            .max(0),
        _ => 0,
    }
}

/// Lit/unlit flame positions, lit first
///
/// The contract's count covers the streak as of the last check-in, so when
/// that check-in was before today one flame is held back until today's lands.
/// A day ahead of the local clock already counts as checked in.
pub fn derive_flame_display(
    streak_count: u64,
    last_submission_day: Option<i64>,
    now_ms: i64,
    capacity: usize,
) -> Vec<bool> {
    let streak = usize::try_from(streak_count).unwrap_or(usize::MAX);

    let today = utc_day(now_ms);
    let lit = match last_submission_day {
        None => 0,
        Some(day) if day >= today => streak.min(capacity),
        Some(_) => streak.saturating_sub(1).min(capacity),
    };

    (0..capacity).map(|i| i < lit).collect()
}

/// Two or more full UTC days without a check-in
pub fn is_streak_at_risk(last_submission_day: Option<i64>, now_ms: i64) -> bool {
    last_submission_day.is_some_and(|day| utc_day(now_ms).saturating_sub(day) >= 2)
}
