//! Check-in Contract
//!
//! The on-chain registry that records daily check-ins and tracks streaks.
//! The contract is a remote service; this module only binds to it.
//!
//! - **StreakContract**: the three operations the client consumes
//! - **abi**: `sol!` bindings for calldata and return values
//! - **RpcStreakContract**: binding over the wallet's JSON-RPC endpoint

pub mod abi;
mod rpc;

pub use rpc::RpcStreakContract;

use crate::error::ProviderError;
use crate::types::{parse_address, Address, TxHash, U256};
use async_trait::async_trait;
use serde::Deserialize;

/// The check-in contract
#[async_trait]
pub trait StreakContract: Send + Sync {
    /// Consecutive-day streak of `address`
    async fn streak_of(&self, address: &Address) -> Result<U256, ProviderError>;

    /// UTC day index of the last check-in by `address` (0 if none)
    async fn last_day_of(&self, address: &Address) -> Result<U256, ProviderError>;

    /// Send a check-in from `from` and wait until it is mined
    async fn say_gm(
        &self,
        from: &Address,
        message: &str,
        irys_id: Option<&str>,
    ) -> Result<TxHash, ProviderError>;
}

/// Contract binding configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    #[serde(default = "default_contract_address")]
    pub address: String,

    /// How long to wait for the check-in to be mined
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval
    #[serde(default = "default_receipt_poll")]
    pub receipt_poll_ms: u64,

    /// Message used when none is given
    #[serde(default = "default_message")]
    pub default_message: String,
}

fn default_contract_address() -> String {
    "0x229D336624b807489CcB034Be5F8c967205c1C1a".to_string()
}

fn default_confirmation_timeout() -> u64 {
    120
}

fn default_receipt_poll() -> u64 {
    1500
}

fn default_message() -> String {
    "Hirys Datapunks".to_string()
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: default_contract_address(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            receipt_poll_ms: default_receipt_poll(),
            default_message: default_message(),
        }
    }
}

impl ContractConfig {
    /// Parsed contract address; `None` when missing or a placeholder
    pub fn parsed_address(&self) -> Option<Address> {
        parse_address(&self.address).ok()
    }
}
