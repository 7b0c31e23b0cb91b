//! Application wiring
//!
//! Builds the session manager, network guard and streak controller, keeps
//! the streak in step with the connected account, and owns the background
//! tasks (wallet listener, streak reload, countdown).

use crate::config::Config;
use crate::contract::{RpcStreakContract, StreakContract};
use crate::error::ClientResult;
use crate::network::NetworkGuard;
use crate::rpc::{JsonRpcClient, RpcConfig};
use crate::streak::{
    CheckInOutcome, Clock, CountdownTicker, StreakController, StreakState, StreakView,
    SubmissionState, SystemClock,
};
use crate::wallet::{RpcWallet, Session, SessionManager, WalletProvider};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Everything a front end needs to render one frame
#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    pub session: Session,
    pub on_target_network: bool,
    pub streak: StreakState,
    pub submission: SubmissionState,
    pub view: StreakView,
}

#[derive(Default)]
struct Tasks {
    reload: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
    ticker: Option<CountdownTicker>,
}

/// The running client
pub struct StreakApp {
    config: Config,
    sessions: Arc<SessionManager>,
    controller: Arc<StreakController>,
    clock: Arc<dyn Clock>,
    rpc_wallet: Option<Arc<RpcWallet>>,
    tasks: Mutex<Tasks>,
}

impl StreakApp {
    /// Assemble the app from explicit collaborators
    pub fn new(
        config: Config,
        provider: Option<Arc<dyn WalletProvider>>,
        contract: Option<Arc<dyn StreakContract>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = Arc::new(NetworkGuard::new(provider.clone(), config.network.clone()));
        let sessions = Arc::new(SessionManager::new(provider, guard));
        let controller = Arc::new(StreakController::new(contract, sessions.clone()));

        Self {
            config,
            sessions,
            controller,
            clock,
            rpc_wallet: None,
            tasks: Mutex::new(Tasks::default()),
        }
    }

    /// Assemble the app against the configured JSON-RPC wallet endpoint
    ///
    /// No endpoint configured means no wallet provider.
    pub fn from_config(config: Config) -> ClientResult<Self> {
        let Some(endpoint) = config.wallet.endpoint.clone() else {
            tracing::warn!("No wallet endpoint configured");
            return Ok(Self::new(config, None, None, Arc::new(SystemClock)));
        };

        let rpc = Arc::new(JsonRpcClient::new(RpcConfig {
            endpoint,
            request_timeout_ms: config.wallet.request_timeout_ms,
            max_retries: config.wallet.max_retries,
            prompt_timeout_ms: config.wallet.prompt_timeout_ms,
        })?);
        let wallet = Arc::new(RpcWallet::new(rpc.clone()));

        let contract: Option<Arc<dyn StreakContract>> = match config.contract.parsed_address() {
            Some(address) => Some(Arc::new(RpcStreakContract::new(
                rpc,
                address,
                Duration::from_secs(config.contract.confirmation_timeout_secs),
                Duration::from_millis(config.contract.receipt_poll_ms),
            ))),
            None => {
                tracing::warn!(
                    address = %config.contract.address,
                    "Contract address not configured"
                );
                None
            }
        };

        let mut app = Self::new(
            config,
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            contract,
            Arc::new(SystemClock),
        );
        app.rpc_wallet = Some(wallet);
        Ok(app)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn controller(&self) -> &Arc<StreakController> {
        &self.controller
    }

    /// Start background tasks; safe to call more than once
    pub fn start(&self) {
        self.sessions.start_event_listener();

        let mut tasks = self.lock_tasks();

        if tasks.reload.is_none() {
            tasks.reload = Some(spawn_streak_reload(
                self.sessions.subscribe(),
                Arc::downgrade(&self.controller),
            ));
        }

        if tasks.poller.is_none() {
            if let Some(wallet) = &self.rpc_wallet {
                let interval = Duration::from_millis(self.config.wallet.poll_interval_ms);
                tasks.poller = Some(wallet.spawn_event_poller(interval));
            }
        }

        if tasks.ticker.is_none() {
            tasks.ticker = Some(CountdownTicker::spawn(
                self.controller.subscribe_state(),
                self.clock.clone(),
                Duration::from_millis(self.config.display.tick_ms),
                self.config.display.flame_capacity,
            ));
        }

        tracing::debug!("App started");
    }

    /// Stop all background tasks
    pub async fn shutdown(&self) {
        self.sessions.stop_event_listener().await;

        let tasks = std::mem::take(&mut *self.lock_tasks());
        for handle in [tasks.reload, tasks.poller].into_iter().flatten() {
            handle.abort();
            let _ = handle.await;
        }
        drop(tasks.ticker);

        tracing::info!("App shut down");
    }

    /// Silent session hydration followed by a streak load
    pub async fn hydrate(&self) -> Session {
        let session = self.sessions.refresh_session().await;
        if let Some(address) = &session.address {
            let _ = self.controller.load_streak(address).await;
        }
        session
    }

    /// Prompting connect followed by a streak load
    pub async fn connect(&self) -> ClientResult<Session> {
        let session = self.sessions.connect().await?;
        if let Some(address) = &session.address {
            let _ = self.controller.load_streak(address).await;
        }
        Ok(session)
    }

    pub async fn switch_network(&self) -> ClientResult<Session> {
        self.sessions.guard().switch_to_target_network().await?;
        Ok(self.sessions.refresh_session().await)
    }

    /// Check in with `message`, or the configured default when `None`
    pub async fn check_in(
        &self,
        message: Option<&str>,
        irys_id: Option<&str>,
    ) -> ClientResult<CheckInOutcome> {
        let message = message.unwrap_or(&self.config.contract.default_message);
        self.controller.submit_check_in(message, irys_id).await
    }

    /// Live view if the ticker runs, else computed on the spot
    pub fn view(&self) -> StreakView {
        if let Some(ticker) = &self.lock_tasks().ticker {
            return ticker.current();
        }
        StreakView::compute(
            &self.controller.state(),
            self.clock.now_millis(),
            self.config.display.flame_capacity,
        )
    }

    pub fn subscribe_view(&self) -> Option<watch::Receiver<StreakView>> {
        self.lock_tasks().ticker.as_ref().map(CountdownTicker::subscribe)
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let session = self.sessions.current();
        AppSnapshot {
            on_target_network: self.sessions.guard().is_on_target_network(&session),
            session,
            streak: self.controller.state(),
            submission: self.controller.submission(),
            view: self.view(),
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keep the streak in step with the session's address
///
/// Session updates are coalesced, so each wake-up compares against what the
/// controller last committed rather than against earlier wake-ups.
fn spawn_streak_reload(
    mut sessions: watch::Receiver<Session>,
    controller: std::sync::Weak<StreakController>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while sessions.changed().await.is_ok() {
            let address = sessions.borrow_and_update().address;

            let Some(controller) = controller.upgrade() else {
                break;
            };

            match address {
                None => controller.reset(),
                Some(address) if controller.loaded_for() != Some(address) => {
                    // Errors are reported on the controller's event channel
                    let _ = controller.load_streak(&address).await;
                }
                Some(_) => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::streak::{SkipReason, MS_PER_DAY};
    use crate::testing::{test_address, wait_for, FixedClock, MockContract, MockWallet};
    use crate::wallet::WalletEvent;

    fn app(wallet: &Arc<MockWallet>, contract: &Arc<MockContract>, now: i64) -> StreakApp {
        let mut config = Config::default();
        config.display.tick_ms = 10;
        StreakApp::new(
            config,
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            Some(contract.clone() as Arc<dyn StreakContract>),
            Arc::new(FixedClock::new(now)),
        )
    }

    #[tokio::test]
    async fn test_connect_loads_streak() {
        let wallet = Arc::new(MockWallet::empty());
        let contract = Arc::new(MockContract::new(5, 19000));
        let app = app(&wallet, &contract, 19000 * MS_PER_DAY + 1000);

        let session = app.connect().await.unwrap();

        assert_eq!(session.address, Some(test_address()));
        let snapshot = app.snapshot();
        assert!(snapshot.on_target_network);
        assert_eq!(snapshot.streak.streak_count, 5);
        assert_eq!(snapshot.view.lit_count(), 5);
        assert!(snapshot.view.countdown_ms > 0);
    }

    #[tokio::test]
    async fn test_without_wallet() {
        let app = StreakApp::new(Config::default(), None, None, Arc::new(SystemClock));

        assert!(matches!(
            app.connect().await.unwrap_err(),
            ClientError::WalletUnavailable
        ));
        assert!(!app.hydrate().await.connected);
    }

    #[tokio::test]
    async fn test_account_switch_reloads_and_disconnect_resets() {
        let wallet = Arc::new(MockWallet::connected(1270));
        let contract = Arc::new(MockContract::new(3, 19000));
        let app = app(&wallet, &contract, 19000 * MS_PER_DAY);
        app.start();

        let mut streak = app.controller().subscribe_state();
        app.hydrate().await;
        wait_for(&mut streak, |s| s.streak_count == 3).await;

        wallet.set_accounts(vec![]);
        wallet.emit(WalletEvent::AccountsChanged(vec![]));
        let state = wait_for(&mut streak, |s| s.streak_count == 0).await;
        assert_eq!(state, StreakState::default());

        contract.set_values(8, 19000);
        wallet.set_accounts(vec![test_address()]);
        wallet.emit(WalletEvent::AccountsChanged(vec![test_address()]));
        wait_for(&mut streak, |s| s.streak_count == 8).await;

        let mut view = app.subscribe_view().unwrap();
        wait_for(&mut view, |v| v.lit_count() == 8).await;

        app.shutdown().await;
        assert_eq!(wallet.subscriber_count(), 0);
        assert!(app.subscribe_view().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_after_direct_load_resets_streak() {
        let wallet = Arc::new(MockWallet::connected(1270));
        let contract = Arc::new(MockContract::new(3, 19000));
        let app = app(&wallet, &contract, 19000 * MS_PER_DAY);

        // Loaded outside the reload task, before it starts watching
        app.hydrate().await;
        assert_eq!(app.controller().state().streak_count, 3);
        app.start();

        wallet.set_accounts(vec![]);
        app.sessions().refresh_session().await;

        let mut streak = app.controller().subscribe_state();
        let state = wait_for(&mut streak, |s| *s == StreakState::default()).await;
        assert_eq!(state, StreakState::default());
        assert_eq!(app.controller().loaded_for(), None);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_then_disconnect_coalesced() {
        let wallet = Arc::new(MockWallet::empty());
        let contract = Arc::new(MockContract::new(4, 19000));
        let app = app(&wallet, &contract, 19000 * MS_PER_DAY);
        app.start();

        // Both session updates land before the reload task runs
        app.connect().await.unwrap();
        wallet.set_accounts(vec![]);
        app.sessions().refresh_session().await;

        let mut streak = app.controller().subscribe_state();
        wait_for(&mut streak, |s| *s == StreakState::default()).await;
        assert!(app.snapshot().session.address.is_none());

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let wallet = Arc::new(MockWallet::connected(1270));
        let contract = Arc::new(MockContract::new(0, 0));
        let app = app(&wallet, &contract, 0);

        app.start();
        app.start();
        assert_eq!(wallet.subscriber_count(), 1);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_check_in_uses_default_message() {
        let wallet = Arc::new(MockWallet::connected(1270));
        let contract = Arc::new(MockContract::new(0, 0));
        let app = app(&wallet, &contract, 19000 * MS_PER_DAY);
        app.hydrate().await;

        app.check_in(None, None).await.unwrap();
        assert_eq!(contract.sent()[0].1, "Hirys Datapunks");

        let outcome = app.check_in(Some("  "), None).await.unwrap();
        assert_eq!(outcome, CheckInOutcome::Skipped(SkipReason::EmptyMessage));
        assert_eq!(contract.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_network() {
        let wallet = Arc::new(MockWallet::connected(1));
        let contract = Arc::new(MockContract::new(0, 0));
        let app = app(&wallet, &contract, 0);
        app.hydrate().await;
        assert!(!app.snapshot().on_target_network);

        let session = app.switch_network().await.unwrap();
        assert_eq!(session.chain_id, Some(1270));
        assert!(app.snapshot().on_target_network);
    }
}
