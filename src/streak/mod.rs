//! Streak Tracking
//!
//! On-chain streak state, the check-in flow, and the values derived from
//! them for display.
//!
//! ## Architecture
//!
//! - **StreakController**: loads streak state and submits check-ins
//! - **CountdownTicker**: recomputes the derived `StreakView` every second
//! - **derive**: pure UTC-day arithmetic (countdown, flames, at-risk)

mod controller;
mod countdown;
pub mod derive;

pub use controller::{CheckInOutcome, SkipReason, StreakController, StreakEvent, SubmissionState};
pub use countdown::{CountdownTicker, StreakView};
pub use derive::{
    derive_countdown, derive_flame_display, is_streak_at_risk, utc_day, DEFAULT_FLAME_CAPACITY,
    MS_PER_DAY,
};

use crate::types::U256;
use serde::Serialize;

/// Streak state of one address as recorded by the contract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakState {
    pub streak_count: u64,
    /// UTC day index of the last check-in, `None` if there never was one
    pub last_submission_day: Option<i64>,
}

impl StreakState {
    /// Build from raw contract values
    ///
    /// The contract stores `lastDay == 0` for addresses that never checked in.
    /// Values past the native ranges saturate.
    pub fn from_contract(streak: U256, last_day: U256) -> Self {
        let last_submission_day = if streak.is_zero() && last_day.is_zero() {
            None
        } else {
            Some(i64::try_from(last_day).unwrap_or(i64::MAX))
        };

        Self {
            streak_count: u64::try_from(streak).unwrap_or(u64::MAX),
            last_submission_day,
        }
    }
}

/// Source of wall-clock time in Unix milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
