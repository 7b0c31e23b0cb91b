//! Chain Value Types
//!
//! Addresses, transaction hashes and native-token amounts as they travel
//! between the wallet, the contract and the session state.

use alloy_primitives::utils::format_units;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use alloy_primitives::{Address, U256};

/// A transaction hash as returned by the wallet / node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

/// Native token amount in the smallest unit (18 decimals on the target chain)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Wei(pub U256);

/// Errors when parsing chain values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid hex quantity: {0}")]
    InvalidQuantity(String),
}

/// Parse a `0x`-prefixed, 40 hex digit address
pub fn parse_address(s: &str) -> Result<Address, ValueError> {
    let trimmed = s.trim();
    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(ValueError::InvalidAddress(s.to_string()));
    }

    trimmed
        .parse()
        .map_err(|_| ValueError::InvalidAddress(s.to_string()))
}

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Wei {
    pub const ZERO: Wei = Wei(U256::ZERO);

    pub fn from_u128(value: u128) -> Self {
        Wei(U256::from(value))
    }

    /// Parse a JSON-RPC hex quantity such as `"0x1bc16d674ec80000"`
    pub fn from_hex_quantity(s: &str) -> Result<Self, ValueError> {
        parse_quantity(s).map(Wei)
    }

    /// Render with `decimals` token decimals, truncated to `places` fractional digits
    ///
    /// Decimals outside what a token can declare render the raw amount.
    pub fn format_units(&self, decimals: u32, places: usize) -> String {
        let formatted = u8::try_from(decimals)
            .ok()
            .and_then(|decimals| format_units(self.0, decimals).ok());

        let Some(formatted) = formatted else {
            return self.0.to_string();
        };

        match formatted.split_once('.') {
            Some((whole, frac)) if places > 0 && !frac.is_empty() => {
                format!("{}.{}", whole, &frac[..places.min(frac.len())])
            }
            Some((whole, _)) => whole.to_string(),
            None => formatted,
        }
    }
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_quantity(s: &str) -> Result<U256, ValueError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ValueError::InvalidQuantity(s.to_string()))?;

    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 16).map_err(|_| ValueError::InvalidQuantity(s.to_string()))
}
