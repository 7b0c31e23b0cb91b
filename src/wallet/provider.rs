//! Wallet provider collaborator

use crate::error::ProviderError;
use crate::network::AddChainParams;
use crate::types::{Address, Wei};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Notifications originated by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// The wallet the user is connected through
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompt the user for account access (`eth_requestAccounts`)
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Read authorized accounts without prompting (`eth_accounts`)
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Active chain id (`eth_chainId`)
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Native balance of `address` at the latest block
    async fn balance(&self, address: &Address) -> Result<Wei, ProviderError>;

    /// Switch the active chain (`wallet_switchEthereumChain`)
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Register a chain with the wallet (`wallet_addEthereumChain`)
    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError>;

    /// Subscribe to account / chain change notifications
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
