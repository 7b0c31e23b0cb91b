//! Network Guard
//!
//! Knows the single chain this client works on and makes sure the wallet is
//! pointed at it, adding the chain to the wallet when it has never seen it.

use crate::error::{ClientError, ClientResult};
use crate::types::TxHash;
use crate::wallet::{Session, WalletProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of the target chain
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetNetwork {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default = "default_chain_name")]
    pub name: String,

    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,

    #[serde(default)]
    pub currency: NativeCurrency,

    #[serde(default = "default_faucet_url")]
    pub faucet_url: String,

    /// Offer `wallet_addEthereumChain` when the wallet doesn't know the chain
    #[serde(default = "default_allow_add_chain")]
    pub allow_add_chain: bool,
}

/// Native currency metadata, as the wallet expects it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "IRYS".to_string(),
            symbol: "IRYS".to_string(),
            decimals: 18,
        }
    }
}

fn default_chain_id() -> u64 {
    1270
}

fn default_chain_name() -> String {
    "Irys Testnet".to_string()
}

fn default_rpc_url() -> String {
    "https://testnet-rpc.irys.xyz/v1/execution-rpc".to_string()
}

fn default_explorer_url() -> String {
    "https://testnet-explorer.irys.xyz".to_string()
}

fn default_faucet_url() -> String {
    "https://irys.xyz/faucet".to_string()
}

fn default_allow_add_chain() -> bool {
    true
}

impl Default for TargetNetwork {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            name: default_chain_name(),
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
            currency: NativeCurrency::default(),
            faucet_url: default_faucet_url(),
            allow_add_chain: default_allow_add_chain(),
        }
    }
}

impl TargetNetwork {
    /// Chain id as the wallet RPC methods want it (`0x4f6`)
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Explorer link for a transaction
    pub fn tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash)
    }

    /// Parameters for `wallet_addEthereumChain`
    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.chain_id_hex(),
            chain_name: self.name.clone(),
            native_currency: self.currency.clone(),
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }
}

/// EIP-3085 `wallet_addEthereumChain` parameter object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Verifies and enforces the wallet's active chain
pub struct NetworkGuard {
    provider: Option<Arc<dyn WalletProvider>>,
    target: TargetNetwork,
}

impl NetworkGuard {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, target: TargetNetwork) -> Self {
        Self { provider, target }
    }

    pub fn target(&self) -> &TargetNetwork {
        &self.target
    }

    /// Whether the session's chain is the target chain
    pub fn is_on_target_network(&self, session: &Session) -> bool {
        session.chain_id == Some(self.target.chain_id)
    }

    /// Ask the wallet to switch to the target chain
    ///
    /// The request is sent even when the wallet is already on the target, the
    /// wallet decides whether to show anything. An unrecognized chain falls
    /// back to adding it; any other failure is returned as is.
    pub async fn switch_to_target_network(&self) -> ClientResult<()> {
        let provider = self.provider.as_ref().ok_or(ClientError::WalletUnavailable)?;

        match provider.switch_chain(self.target.chain_id).await {
            Ok(()) => {
                tracing::info!(chain_id = self.target.chain_id, "Wallet switched to target chain");
                Ok(())
            }
            Err(e) if e.is_unrecognized_chain() => {
                if !self.target.allow_add_chain {
                    return Err(ClientError::ChainUnrecognized(self.target.chain_id));
                }

                tracing::info!(
                    chain_id = self.target.chain_id,
                    name = %self.target.name,
                    "Wallet does not know target chain, requesting add"
                );
                provider.add_chain(&self.target.add_chain_params()).await?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chain switch failed");
                Err(e.into())
            }
        }
    }
}
