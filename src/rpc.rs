//! JSON-RPC Transport
//!
//! HTTP client for the JSON-RPC 2.0 endpoint exposed by the wallet.
//!
//! Reads are retried with backoff on transport failures. Methods that prompt
//! the user or send a transaction go out exactly once and wait up to the
//! prompt timeout. RPC error objects are returned to the caller immediately.

use crate::error::ProviderError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC client for one endpoint
pub struct JsonRpcClient {
    client: Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

/// Configuration for the JSON-RPC client
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Endpoint URL (e.g., "http://127.0.0.1:1248")
    pub endpoint: String,
    /// Timeout for read requests in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts for read requests on transport failures
    pub max_retries: u32,
    /// Timeout for requests waiting on the user (approve, sign, switch)
    pub prompt_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:1248".to_string(),
            request_timeout_ms: 10_000,
            max_retries: 3,
            prompt_timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl JsonRpcClient {
    /// Create a new client for the configured endpoint
    pub fn new(config: RpcConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Call a read-only `method` and decode its result
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let raw = self.call_raw(method, params).await?;
        serde_json::from_value(raw).map_err(ProviderError::from)
    }

    /// Call a read-only `method` and return the raw `result` (`null` when absent)
    pub async fn call_raw(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = self.request(method, params);
        let timeout = Duration::from_millis(self.config.request_timeout_ms);

        let mut last_error = ProviderError::Transport("no attempt made".to_string());
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            if attempt > 0 {
                // Backoff: 250ms, 1s, 2.25s...
                let delay = Duration::from_millis(250 * (attempt as u64).pow(2));
                tokio::time::sleep(delay).await;
            }

            match self.send(&request, timeout).await {
                Ok(response) => return read_response(response).await,
                Err(e) => {
                    tracing::debug!(method, attempt, error = %e, "JSON-RPC transport failure");
                    last_error = ProviderError::Transport(e.to_string());
                }
            }
        }

        Err(last_error)
    }

    /// Call a prompting or state-changing `method` once and decode its result
    ///
    /// Never retried: a timed-out request may still be waiting in the wallet.
    pub async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let raw = self.call_once_raw(method, params).await?;
        serde_json::from_value(raw).map_err(ProviderError::from)
    }

    /// Raw form of [`call_once`](Self::call_once)
    pub async fn call_once_raw(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = self.request(method, params);
        let timeout = Duration::from_millis(self.config.prompt_timeout_ms);

        let response = self.send(&request, timeout).await.map_err(|e| {
            tracing::debug!(method, error = %e, "JSON-RPC transport failure");
            ProviderError::Transport(e.to_string())
        })?;

        read_response(response).await
    }

    fn request<'a>(&self, method: &'a str, params: Value) -> RpcRequest<'a> {
        RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        }
    }

    async fn send(
        &self,
        request: &RpcRequest<'_>,
        timeout: Duration,
    ) -> Result<Response, reqwest::Error> {
        self.client
            .post(&self.config.endpoint)
            .timeout(timeout)
            .json(request)
            .send()
            .await
    }
}

async fn read_response(response: Response) -> Result<Value, ProviderError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::Transport(format!(
            "HTTP {}: {}",
            status.as_u16(),
            text
        )));
    }

    let body: RpcResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    match (body.error, body.result) {
        (Some(err), _) => Err(ProviderError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        }),
        (None, result) => Ok(result.unwrap_or(Value::Null)),
    }
}
