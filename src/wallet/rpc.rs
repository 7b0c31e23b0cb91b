//! JSON-RPC wallet
//!
//! `WalletProvider` backed by a wallet that exposes EIP-1193 methods over
//! HTTP. HTTP has no push channel, so account and chain changes are detected
//! by polling and re-broadcast as `WalletEvent`s.

use super::provider::{WalletEvent, WalletProvider};
use crate::error::ProviderError;
use crate::network::AddChainParams;
use crate::rpc::JsonRpcClient;
use crate::types::{parse_address, parse_quantity, Address, Wei};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Capacity of the wallet event channel
const EVENT_CAPACITY: usize = 64;

/// Wallet reached through a JSON-RPC endpoint
pub struct RpcWallet {
    rpc: Arc<JsonRpcClient>,
    events: broadcast::Sender<WalletEvent>,
}

impl RpcWallet {
    pub fn new(rpc: Arc<JsonRpcClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { rpc, events }
    }

    /// Shared transport, also used for contract calls
    pub fn rpc(&self) -> &Arc<JsonRpcClient> {
        &self.rpc
    }

    /// Poll accounts and chain every `interval`, emitting events on change
    ///
    /// The first poll only records the baseline.
    pub fn spawn_event_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let wallet = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_chain: Option<u64> = None;

            loop {
                ticker.tick().await;

                let Some(wallet) = wallet.upgrade() else {
                    break;
                };

                match wallet.accounts().await {
                    Ok(accounts) => {
                        if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                            let _ = wallet
                                .events
                                .send(WalletEvent::AccountsChanged(accounts.clone()));
                        }
                        last_accounts = Some(accounts);
                    }
                    Err(e) => tracing::debug!(error = %e, "Account poll failed"),
                }

                match wallet.chain_id().await {
                    Ok(chain_id) => {
                        if last_chain.is_some_and(|prev| prev != chain_id) {
                            let _ = wallet.events.send(WalletEvent::ChainChanged(chain_id));
                        }
                        last_chain = Some(chain_id);
                    }
                    Err(e) => tracing::debug!(error = %e, "Chain poll failed"),
                }
            }
        })
    }
}

fn parse_accounts(raw: Vec<String>) -> Result<Vec<Address>, ProviderError> {
    raw.iter()
        .map(|a| parse_address(a).map_err(ProviderError::from))
        .collect()
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let raw: Vec<String> = self
            .rpc
            .call_once("eth_requestAccounts", json!([]))
            .await?;
        parse_accounts(raw)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let raw: Vec<String> = self.rpc.call("eth_accounts", json!([])).await?;
        parse_accounts(raw)
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let raw: String = self.rpc.call("eth_chainId", json!([])).await?;
        let chain_id = parse_quantity(&raw)?;
        u64::try_from(chain_id).map_err(|_| ProviderError::Decode(format!("chain id {}", raw)))
    }

    async fn balance(&self, address: &Address) -> Result<Wei, ProviderError> {
        let raw: String = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        Ok(Wei::from_hex_quantity(&raw)?)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.rpc
            .call_once_raw(
                "wallet_switchEthereumChain",
                json!([{ "chainId": format!("{:#x}", chain_id) }]),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError> {
        self.rpc
            .call_once_raw("wallet_addEthereumChain", json!([params]))
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
