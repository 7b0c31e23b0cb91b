//! Client error types
//!
//! `ProviderError` covers everything the wallet or node can report back;
//! `ClientError` is what the public operations of the session, network and
//! streak layers return.

use crate::config::ConfigError;
use crate::types::{TxHash, ValueError};
use serde_json::Value;
use thiserror::Error;

/// EIP-1193: the requested account and/or method has not been authorized
pub const CODE_UNAUTHORIZED: i64 = 4100;

/// EIP-3326: the wallet does not know the requested chain
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

/// EIP-1193: the user rejected the request
pub const CODE_USER_REJECTED: i64 = 4001;

/// Errors reported by the wallet provider or the node behind it
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Connection refused, timeout, or other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON-RPC error object returned by the wallet or node
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// Response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transaction was mined but reverted
    #[error("Transaction {tx_hash} reverted")]
    Reverted {
        tx_hash: TxHash,
        reason: Option<String>,
    },

    /// Transaction was not mined within the confirmation timeout
    #[error("Transaction {0} not confirmed in time")]
    ConfirmationTimeout(TxHash),
}

impl ProviderError {
    /// JSON-RPC error code, if any
    pub fn code(&self) -> Option<i64> {
        match self {
            ProviderError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The wallet does not know the chain we asked it to switch to
    pub fn is_unrecognized_chain(&self) -> bool {
        match self {
            ProviderError::Rpc { code, message, .. } => {
                *code == CODE_UNRECOGNIZED_CHAIN || message.contains("Unrecognized chain ID")
            }
            _ => false,
        }
    }

    /// The wallet has no authorized account for us
    pub fn is_no_active_account(&self) -> bool {
        self.code() == Some(CODE_UNAUTHORIZED)
    }

    /// Concise reason, when the wallet or node provided one
    ///
    /// Looks at the `data.message` / `data.reason` field of RPC errors and the
    /// revert reason of mined transactions.
    pub fn short_message(&self) -> Option<String> {
        match self {
            ProviderError::Rpc { data: Some(data), .. } => data
                .get("message")
                .or_else(|| data.get("reason"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ProviderError::Reverted {
                reason: Some(reason),
                ..
            } => Some(format!("execution reverted: {}", reason)),
            _ => None,
        }
    }

    /// Best message to show a person: the short form, else the full one
    pub fn user_message(&self) -> String {
        self.short_message().unwrap_or_else(|| self.to_string())
    }
}

impl From<ValueError> for ProviderError {
    fn from(err: ValueError) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

/// Errors returned by the client's public operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// No wallet provider is available
    #[error("No wallet provider available. Install or start an EVM wallet.")]
    WalletUnavailable,

    /// Action attempted while the wallet is on another chain
    #[error("Wrong network: expected chain {expected}, wallet is on {}", display_chain(.actual))]
    WrongNetwork { expected: u64, actual: Option<u64> },

    /// Generic wallet / RPC failure
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Wallet does not know the target chain and adding it is disabled
    #[error("Wallet does not recognize chain {0}")]
    ChainUnrecognized(u64),

    /// Check-in transaction failed or reverted
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// No account connected
    #[error("No account connected")]
    NotConnected,

    /// Contract address missing or placeholder
    #[error("Contract address is not configured")]
    ContractNotConfigured,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn display_chain(chain: &Option<u64>) -> String {
    chain
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
