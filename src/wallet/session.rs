//! Session Manager
//!
//! Owns the client's view of the connected wallet and keeps it in sync with
//! the provider. The `Session` is published through a watch channel and is
//! only ever replaced whole.

use super::provider::{WalletEvent, WalletProvider};
use crate::error::{ClientError, ClientResult, ProviderError};
use crate::network::NetworkGuard;
use crate::types::{Address, Wei};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// The client's view of the connected wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connected: bool,
    pub address: Option<Address>,
    pub balance: Wei,
    pub chain_id: Option<u64>,
}

/// Keeps the `Session` in sync with the wallet provider
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    guard: Arc<NetworkGuard>,
    session: watch::Sender<Session>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a manager; `provider` is `None` when no wallet is available
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, guard: Arc<NetworkGuard>) -> Self {
        let (session, _) = watch::channel(Session::default());

        Self {
            provider,
            guard,
            session,
            listener: Mutex::new(None),
        }
    }

    /// Current session snapshot
    pub fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Watch session replacements
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn guard(&self) -> &Arc<NetworkGuard> {
        &self.guard
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether the current session is on the target chain
    pub fn is_on_target_network(&self) -> bool {
        self.guard.is_on_target_network(&self.session.borrow())
    }

    /// Request account access, fix the chain, then hydrate the session
    pub async fn connect(&self) -> ClientResult<Session> {
        let provider = self.provider.as_ref().ok_or(ClientError::WalletUnavailable)?;

        let accounts = provider.request_accounts().await?;
        tracing::info!(accounts = accounts.len(), "Wallet granted account access");

        let chain_id = provider.chain_id().await?;
        let target = self.guard.target().chain_id;
        if chain_id != target {
            tracing::info!(current = chain_id, target, "Wallet on another chain, switching");
            self.guard.switch_to_target_network().await?;
        }

        Ok(self.refresh_session().await)
    }

    /// Re-read accounts, chain and balance without prompting
    ///
    /// Provider failures are logged and leave the previous session in place,
    /// except when the wallet says no account is authorized.
    pub async fn refresh_session(&self) -> Session {
        match self.read_session().await {
            Ok(session) => {
                self.publish(session.clone());
                session
            }
            Err(e) if e.is_no_active_account() => {
                tracing::info!(error = %e, "Wallet reports no active account");
                self.publish(Session::default());
                Session::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, keeping last known session");
                self.current()
            }
        }
    }

    async fn read_session(&self) -> Result<Session, ProviderError> {
        let Some(provider) = &self.provider else {
            return Ok(Session::default());
        };

        let accounts = provider.accounts().await?;
        let Some(address) = accounts.into_iter().next() else {
            return Ok(Session::default());
        };

        let chain_id = provider.chain_id().await?;
        let balance = provider.balance(&address).await?;

        Ok(Session {
            connected: true,
            address: Some(address),
            balance,
            chain_id: Some(chain_id),
        })
    }

    fn publish(&self, session: Session) {
        let previous = self.session.send_replace(session);
        let current = self.session.borrow();

        if previous.connected && !current.connected {
            tracing::info!("Wallet disconnected");
        } else if previous.address != current.address {
            if let Some(address) = &current.address {
                tracing::info!(address = %address, "Active account changed");
            }
        }
        if previous.chain_id != current.chain_id {
            tracing::debug!(chain_id = ?current.chain_id, "Active chain changed");
        }
    }

    /// Start listening for wallet events
    ///
    /// Returns `false` when a listener is already running or there is no
    /// provider to listen to.
    pub fn start_event_listener(self: &Arc<Self>) -> bool {
        let Some(provider) = &self.provider else {
            tracing::debug!("No wallet provider, event listener not started");
            return false;
        };

        let mut slot = self.lock_listener();
        if slot.is_some() {
            return false;
        }

        let mut events = provider.subscribe();
        let manager = Arc::downgrade(self);

        *slot = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(WalletEvent::AccountsChanged(accounts)) => {
                        tracing::debug!(accounts = accounts.len(), "Wallet accounts changed");
                    }
                    Ok(WalletEvent::ChainChanged(chain_id)) => {
                        tracing::debug!(chain_id, "Wallet chain changed");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Wallet event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.refresh_session().await;
            }

            tracing::debug!("Wallet event listener stopped");
        }));

        tracing::info!("Listening for wallet events");
        true
    }

    /// Stop the event listener and drop the subscription
    pub async fn stop_event_listener(&self) {
        let handle = self.lock_listener().take();

        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn is_listening(&self) -> bool {
        self.lock_listener().is_some()
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_listener().take() {
            handle.abort();
        }
    }
}
