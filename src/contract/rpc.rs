//! Contract binding over JSON-RPC
//!
//! Reads go through `eth_call`; the check-in is sent with
//! `eth_sendTransaction` (the wallet signs) and confirmed by polling
//! `eth_getTransactionReceipt`.

use super::abi::{self, lastDayCall, sayGMCall, streakCall};
use super::StreakContract;
use crate::error::ProviderError;
use crate::rpc::JsonRpcClient;
use crate::types::{Address, TxHash, U256};
use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Check-in contract reached through the wallet endpoint
pub struct RpcStreakContract {
    rpc: Arc<JsonRpcClient>,
    address: Address,
    confirmation_timeout: Duration,
    receipt_poll: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
}

impl RpcStreakContract {
    pub fn new(
        rpc: Arc<JsonRpcClient>,
        address: Address,
        confirmation_timeout: Duration,
        receipt_poll: Duration,
    ) -> Self {
        Self {
            rpc,
            address,
            confirmation_timeout,
            receipt_poll,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    async fn call_view<C: SolCall + Send>(&self, call: C) -> Result<C::Return, ProviderError> {
        let data = Bytes::from(call.abi_encode());
        let raw: Bytes = self
            .rpc
            .call(
                "eth_call",
                json!([{ "to": self.address, "data": data }, "latest"]),
            )
            .await?;
        abi::decode_return::<C>(&raw)
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TransactionReceipt, ProviderError> {
        let poll = async {
            let mut ticker = tokio::time::interval(self.receipt_poll);
            loop {
                ticker.tick().await;

                let receipt: Option<TransactionReceipt> = self
                    .rpc
                    .call("eth_getTransactionReceipt", json!([hash.as_str()]))
                    .await?;

                if let Some(receipt) = receipt {
                    return Ok(receipt);
                }
                tracing::trace!(tx = %hash, "Check-in not mined yet");
            }
        };

        tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| ProviderError::ConfirmationTimeout(hash.clone()))?
    }
}

#[async_trait]
impl StreakContract for RpcStreakContract {
    async fn streak_of(&self, address: &Address) -> Result<U256, ProviderError> {
        Ok(self.call_view(streakCall { user: *address }).await?._0)
    }

    async fn last_day_of(&self, address: &Address) -> Result<U256, ProviderError> {
        Ok(self.call_view(lastDayCall { user: *address }).await?._0)
    }

    async fn say_gm(
        &self,
        from: &Address,
        message: &str,
        irys_id: Option<&str>,
    ) -> Result<TxHash, ProviderError> {
        let data = Bytes::from(
            sayGMCall {
                message: message.to_string(),
                irys_id: irys_id.unwrap_or_default().to_string(),
            }
            .abi_encode(),
        );

        // Waits on the user's approval; must never be re-sent
        let hash: String = self
            .rpc
            .call_once(
                "eth_sendTransaction",
                json!([{ "from": from, "to": self.address, "data": data }]),
            )
            .await?;
        let hash = TxHash(hash);
        tracing::info!(tx = %hash, "Check-in transaction sent");

        let receipt = self.wait_for_receipt(&hash).await?;
        let mined = TxHash(receipt.transaction_hash);

        match receipt.status.as_deref() {
            Some("0x0") => Err(ProviderError::Reverted {
                tx_hash: mined,
                reason: None,
            }),
            _ => Ok(mined),
        }
    }
}
