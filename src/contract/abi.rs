//! Check-in contract ABI
//!
//! Calldata and return values are produced by `alloy-sol-types` from the
//! Solidity signatures below; selectors are derived, not pinned.

use crate::error::ProviderError;
use alloy_sol_types::{sol, SolCall};

sol! {
    function sayGM(string message, string irys_id) external;
    function streak(address user) external view returns (uint256);
    function lastDay(address user) external view returns (uint256);
}

/// Decode the return data of `C`
pub fn decode_return<C: SolCall>(data: &[u8]) -> Result<C::Return, ProviderError> {
    C::abi_decode_returns(data, true).map_err(|e| ProviderError::Decode(e.to_string()))
}
