//! Streak Controller
//!
//! Loads the connected address's streak from the contract and sends the
//! daily check-in. Only this controller writes `StreakState`.

use super::StreakState;
use crate::contract::StreakContract;
use crate::error::{ClientError, ClientResult};
use crate::types::{Address, TxHash};
use crate::wallet::SessionManager;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// Capacity of the streak event channel
const EVENT_CAPACITY: usize = 64;

/// State of the current / last check-in attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionState {
    pub pending: bool,
    pub last_tx_hash: Option<TxHash>,
    pub last_error: Option<String>,
    pub attempt_id: Option<Uuid>,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum StreakEvent {
    /// Fresh streak state committed
    Loaded(StreakState),
    /// Check-in mined; time to celebrate
    SubmissionSucceeded { tx_hash: TxHash, explorer_url: String },
    /// Check-in failed with a displayable message
    SubmissionFailed { message: String },
    /// Reading the streak failed; prior state kept
    Error { message: String },
}

/// What `submit_check_in` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    Confirmed(TxHash),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Message empty after trimming
    EmptyMessage,
    /// Another check-in from this client is still pending
    InFlight,
}

/// Loads streak state and submits check-ins
pub struct StreakController {
    contract: Option<Arc<dyn StreakContract>>,
    sessions: Arc<SessionManager>,
    state: watch::Sender<StreakState>,
    /// Address the committed `state` belongs to
    loaded_for: Mutex<Option<Address>>,
    submission: watch::Sender<SubmissionState>,
    in_flight: AtomicBool,
    events: broadcast::Sender<StreakEvent>,
}

/// Clears the pending flag when the attempt ends, however it ends
struct PendingGuard<'a> {
    controller: &'a StreakController,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.controller
            .submission
            .send_modify(|submission| submission.pending = false);
        self.controller.in_flight.store(false, Ordering::Release);
    }
}

impl StreakController {
    /// Create a controller; `contract` is `None` when no contract is configured
    pub fn new(contract: Option<Arc<dyn StreakContract>>, sessions: Arc<SessionManager>) -> Self {
        let (state, _) = watch::channel(StreakState::default());
        let (submission, _) = watch::channel(SubmissionState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            contract,
            sessions,
            state,
            loaded_for: Mutex::new(None),
            submission,
            in_flight: AtomicBool::new(false),
            events,
        }
    }

    pub fn state(&self) -> StreakState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StreakState> {
        self.state.subscribe()
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission.borrow().clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StreakEvent> {
        self.events.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Address of the currently committed streak, if any
    pub fn loaded_for(&self) -> Option<Address> {
        *self.lock_loaded_for()
    }

    /// Forget the streak (wallet disconnected)
    pub fn reset(&self) {
        let mut loaded_for = self.lock_loaded_for();
        *loaded_for = None;
        self.state.send_if_modified(|state| {
            let changed = *state != StreakState::default();
            *state = StreakState::default();
            changed
        });
    }

    fn lock_loaded_for(&self) -> MutexGuard<'_, Option<Address>> {
        self.loaded_for
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: StreakEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Read streak count and last check-in day for `address`
    ///
    /// On failure the previous state is kept and the error is reported on
    /// the event channel. A result for an address that is no longer the
    /// session's address is returned but not committed.
    pub async fn load_streak(&self, address: &Address) -> ClientResult<StreakState> {
        let contract = self
            .contract
            .as_ref()
            .ok_or(ClientError::ContractNotConfigured)?;

        let (streak, last_day) =
            tokio::join!(contract.streak_of(address), contract.last_day_of(address));

        let state = match (streak, last_day) {
            (Ok(streak), Ok(last_day)) => StreakState::from_contract(streak, last_day),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(address = %address, error = %e, "Failed to load streak");
                self.emit(StreakEvent::Error {
                    message: e.user_message(),
                });
                return Err(e.into());
            }
        };

        {
            // Checked under the lock so a concurrent reset can't be overwritten
            let mut loaded_for = self.lock_loaded_for();
            if self.sessions.current().address.as_ref() != Some(address) {
                tracing::debug!(address = %address, "Discarding streak for inactive address");
                return Ok(state);
            }
            self.state.send_replace(state);
            *loaded_for = Some(*address);
        }
        self.emit(StreakEvent::Loaded(state));
        tracing::debug!(
            address = %address,
            streak = state.streak_count,
            last_day = ?state.last_submission_day,
            "Streak loaded"
        );

        Ok(state)
    }

    /// Send today's check-in
    ///
    /// Empty messages and calls made while another check-in is pending are
    /// skipped without touching the network.
    pub async fn submit_check_in(
        &self,
        message: &str,
        irys_id: Option<&str>,
    ) -> ClientResult<CheckInOutcome> {
        let message = message.trim();
        if message.is_empty() {
            tracing::debug!("Empty check-in message, nothing to send");
            return Ok(CheckInOutcome::Skipped(SkipReason::EmptyMessage));
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Check-in already in flight");
            return Ok(CheckInOutcome::Skipped(SkipReason::InFlight));
        }

        let attempt_id = Uuid::new_v4();
        self.submission.send_replace(SubmissionState {
            pending: true,
            last_tx_hash: None,
            last_error: None,
            attempt_id: Some(attempt_id),
        });
        let _pending = PendingGuard { controller: self };

        match self.send_check_in(message, irys_id).await {
            Ok((address, tx_hash)) => {
                let explorer_url = self.sessions.guard().target().tx_url(&tx_hash);
                tracing::info!(attempt = %attempt_id, tx = %tx_hash, "Check-in confirmed");

                self.submission
                    .send_modify(|s| s.last_tx_hash = Some(tx_hash.clone()));
                self.emit(StreakEvent::SubmissionSucceeded {
                    tx_hash: tx_hash.clone(),
                    explorer_url,
                });

                // Failures are already reported by load_streak
                let _ = self.load_streak(&address).await;

                Ok(CheckInOutcome::Confirmed(tx_hash))
            }
            Err(e) => {
                let message = match &e {
                    ClientError::SubmissionFailed(message) => message.clone(),
                    other => other.to_string(),
                };
                tracing::warn!(attempt = %attempt_id, error = %message, "Check-in failed");

                self.submission
                    .send_modify(|s| s.last_error = Some(message.clone()));
                self.emit(StreakEvent::SubmissionFailed { message });

                Err(e)
            }
        }
    }

    async fn send_check_in(
        &self,
        message: &str,
        irys_id: Option<&str>,
    ) -> ClientResult<(Address, TxHash)> {
        let session = self.sessions.current();
        let address = session.address.ok_or(ClientError::NotConnected)?;

        let guard = self.sessions.guard();
        if !guard.is_on_target_network(&session) {
            return Err(ClientError::WrongNetwork {
                expected: guard.target().chain_id,
                actual: session.chain_id,
            });
        }

        let contract = self
            .contract
            .as_ref()
            .ok_or(ClientError::ContractNotConfigured)?;

        let tx_hash = contract
            .say_gm(&address, message, irys_id)
            .await
            .map_err(|e| ClientError::SubmissionFailed(e.user_message()))?;

        Ok((address, tx_hash))
    }
}
