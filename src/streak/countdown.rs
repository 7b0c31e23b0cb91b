//! Countdown Ticker
//!
//! Day rollover is not signalled by the wallet or the chain, so the derived
//! view is recomputed on a fixed tick (and whenever the streak changes).

use super::derive::{derive_countdown, derive_flame_display, is_streak_at_risk};
use super::{Clock, StreakState};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Display values derived from the streak and the clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakView {
    pub now_ms: i64,
    /// Milliseconds until the next check-in is allowed
    pub countdown_ms: i64,
    pub flames: Vec<bool>,
    pub at_risk: bool,
}

impl StreakView {
    pub fn compute(state: &StreakState, now_ms: i64, capacity: usize) -> Self {
        Self {
            now_ms,
            countdown_ms: derive_countdown(now_ms, state.last_submission_day),
            flames: derive_flame_display(
                state.streak_count,
                state.last_submission_day,
                now_ms,
                capacity,
            ),
            at_risk: is_streak_at_risk(state.last_submission_day, now_ms),
        }
    }

    pub fn lit_count(&self) -> usize {
        self.flames.iter().filter(|lit| **lit).count()
    }

    pub fn is_eligible(&self) -> bool {
        self.countdown_ms == 0
    }
}

/// Recurring task publishing a fresh `StreakView`
pub struct CountdownTicker {
    handle: Option<JoinHandle<()>>,
    view: watch::Receiver<StreakView>,
}

impl CountdownTicker {
    /// Start ticking every `tick`
    pub fn spawn(
        mut streak: watch::Receiver<StreakState>,
        clock: Arc<dyn Clock>,
        tick: Duration,
        capacity: usize,
    ) -> Self {
        let state = *streak.borrow_and_update();
        let initial = StreakView::compute(&state, clock.now_millis(), capacity);
        let (tx, view) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut streak_open = true;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = streak.changed(), if streak_open => {
                        if changed.is_err() {
                            streak_open = false;
                        }
                    }
                }

                let state = *streak.borrow_and_update();
                tx.send_replace(StreakView::compute(&state, clock.now_millis(), capacity));
            }
        });

        Self {
            handle: Some(handle),
            view,
        }
    }

    pub fn current(&self) -> StreakView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StreakView> {
        self.view.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the recurring task
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Countdown ticker stopped");
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
