//! In-memory collaborators for unit tests

use crate::contract::StreakContract;
use crate::error::ProviderError;
use crate::network::AddChainParams;
use crate::streak::Clock;
use crate::rpc::{JsonRpcClient, RpcConfig};
use crate::types::{parse_quantity, Address, TxHash, Wei, U256};
use crate::wallet::{WalletEvent, WalletProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;

pub fn test_address() -> Address {
    Address::repeat_byte(0x11)
}

pub fn other_address() -> Address {
    Address::repeat_byte(0x22)
}

/// Poll (bounded) until `condition` holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

/// Wait (bounded) until the watched value satisfies `predicate`
pub async fn wait_for<T: Clone>(
    rx: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for value")
        .expect("sender dropped")
        .clone()
}

struct WalletState {
    accounts: Vec<Address>,
    chain_id: u64,
    balance: Wei,
    read_error: Option<ProviderError>,
    next_switch_error: Option<ProviderError>,
    switch_calls: usize,
    added_chains: Vec<AddChainParams>,
}

pub struct MockWallet {
    state: Mutex<WalletState>,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWallet {
    fn with(accounts: Vec<Address>, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(WalletState {
                accounts,
                chain_id,
                balance: Wei::from_u128(1_500_000_000_000_000_000),
                read_error: None,
                next_switch_error: None,
                switch_calls: 0,
                added_chains: Vec::new(),
            }),
            events,
        }
    }

    /// One authorized account on `chain_id`
    pub fn connected(chain_id: u64) -> Self {
        Self::with(vec![test_address()], chain_id)
    }

    /// No authorized account yet, on the target chain
    pub fn empty() -> Self {
        Self::with(Vec::new(), 1270)
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    pub fn set_chain(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn fail_reads(&self, error: Option<ProviderError>) {
        self.state.lock().unwrap().read_error = error;
    }

    pub fn fail_next_switch(&self, error: ProviderError) {
        self.state.lock().unwrap().next_switch_error = Some(error);
    }

    pub fn switch_calls(&self) -> usize {
        self.state.lock().unwrap().switch_calls
    }

    pub fn added_chains(&self) -> Vec<AddChainParams> {
        self.state.lock().unwrap().added_chains.clone()
    }

    pub fn current_chain(&self) -> u64 {
        self.state.lock().unwrap().chain_id
    }

    pub fn current_balance(&self) -> Wei {
        self.state.lock().unwrap().balance
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn check_read(&self) -> Result<(), ProviderError> {
        match &self.state.lock().unwrap().read_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.accounts.is_empty() {
            state.accounts.push(test_address());
        }
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.check_read()?;
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.check_read()?;
        Ok(self.state.lock().unwrap().chain_id)
    }

    async fn balance(&self, _address: &Address) -> Result<Wei, ProviderError> {
        self.check_read()?;
        Ok(self.state.lock().unwrap().balance)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.switch_calls += 1;
        if let Some(e) = state.next_switch_error.take() {
            return Err(e);
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.added_chains.push(params.clone());
        state.chain_id = u64::try_from(parse_quantity(&params.chain_id)?)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

struct ContractState {
    streak: u64,
    last_day: u64,
    after_submit: Option<(u64, u64)>,
    read_error: Option<ProviderError>,
    next_submit_error: Option<ProviderError>,
    sent: Vec<(Address, String, Option<String>)>,
}

pub struct MockContract {
    state: Mutex<ContractState>,
    hold: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl MockContract {
    pub fn new(streak: u64, last_day: u64) -> Self {
        Self {
            state: Mutex::new(ContractState {
                streak,
                last_day,
                after_submit: None,
                read_error: None,
                next_submit_error: None,
                sent: Vec::new(),
            }),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            released: Notify::new(),
        }
    }

    pub fn set_values(&self, streak: u64, last_day: u64) {
        let mut state = self.state.lock().unwrap();
        state.streak = streak;
        state.last_day = last_day;
    }

    /// Values the contract reports once a check-in is mined
    pub fn after_submit(&self, streak: u64, last_day: u64) {
        self.state.lock().unwrap().after_submit = Some((streak, last_day));
    }

    pub fn fail_reads(&self, error: Option<ProviderError>) {
        self.state.lock().unwrap().read_error = error;
    }

    pub fn fail_next_submit(&self, error: ProviderError) {
        self.state.lock().unwrap().next_submit_error = Some(error);
    }

    pub fn sent(&self) -> Vec<(Address, String, Option<String>)> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Make `say_gm` block until `release()`
    pub fn hold_submissions(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub async fn wait_until_entered(&self) {
        tokio::time::timeout(Duration::from_secs(2), self.entered.notified())
            .await
            .expect("say_gm was never called");
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    fn check_read(&self) -> Result<(), ProviderError> {
        match &self.state.lock().unwrap().read_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StreakContract for MockContract {
    async fn streak_of(&self, _address: &Address) -> Result<U256, ProviderError> {
        self.check_read()?;
        Ok(U256::from(self.state.lock().unwrap().streak))
    }

    async fn last_day_of(&self, _address: &Address) -> Result<U256, ProviderError> {
        self.check_read()?;
        Ok(U256::from(self.state.lock().unwrap().last_day))
    }

    async fn say_gm(
        &self,
        from: &Address,
        message: &str,
        irys_id: Option<&str>,
    ) -> Result<TxHash, ProviderError> {
        let count = {
            let mut state = self.state.lock().unwrap();
            state
                .sent
                .push((*from, message.to_string(), irys_id.map(str::to_string)));
            state.sent.len()
        };
        self.entered.notify_one();

        if self.hold.load(Ordering::SeqCst) {
            self.released.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.next_submit_error.take() {
            return Err(e);
        }
        if let Some((streak, last_day)) = state.after_submit {
            state.streak = streak;
            state.last_day = last_day;
        }
        Ok(TxHash(format!("0x{:064x}", count)))
    }
}

/// Manually driven clock
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// How the stub answers one JSON-RPC method
#[derive(Debug, Clone)]
pub enum StubReply {
    Result(Value),
    Error { code: i64, message: String },
    /// Read the request, never answer
    Hang,
}

#[derive(Default)]
struct StubState {
    replies: HashMap<String, StubReply>,
    calls: HashMap<String, usize>,
}

/// Minimal HTTP JSON-RPC endpoint on a local port
///
/// Unknown methods get a -32601 error; every request is counted per method.
pub struct RpcStub {
    addr: SocketAddr,
    state: Arc<Mutex<StubState>>,
    task: JoinHandle<()>,
}

impl RpcStub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(StubState::default()));

        let shared = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_stub(socket, shared.clone()));
            }
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client with short timeouts pointed at this stub
    pub fn client(&self, request_timeout_ms: u64, max_retries: u32) -> Arc<JsonRpcClient> {
        Arc::new(
            JsonRpcClient::new(RpcConfig {
                endpoint: self.url(),
                request_timeout_ms,
                max_retries,
                prompt_timeout_ms: 200,
            })
            .unwrap(),
        )
    }

    pub fn reply(&self, method: &str, reply: StubReply) {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert(method.to_string(), reply);
    }

    pub fn result(&self, method: &str, value: Value) {
        self.reply(method, StubReply::Result(value));
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for RpcStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_stub(mut socket: TcpStream, state: Arc<Mutex<StubState>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let body = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(body) = http_body(&buf) {
            break body;
        }
    };

    let Ok(request) = serde_json::from_slice::<Value>(&body) else {
        return;
    };
    let method = request["method"].as_str().unwrap_or_default().to_string();

    let reply = {
        let mut state = state.lock().unwrap();
        *state.calls.entry(method.clone()).or_default() += 1;
        state.replies.get(&method).cloned()
    };

    let payload = match reply {
        Some(StubReply::Result(result)) => {
            json!({ "jsonrpc": "2.0", "id": request["id"], "result": result })
        }
        Some(StubReply::Error { code, message }) => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": code, "message": message },
        }),
        Some(StubReply::Hang) => {
            std::future::pending::<()>().await;
            return;
        }
        None => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": -32601, "message": format!("method {} not found", method) },
        }),
    };

    let payload = payload.to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
         content-length: {}\r\nconnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Request body once headers and `content-length` bytes have arrived
fn http_body(buf: &[u8]) -> Option<Vec<u8>> {
    let header_end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    (buf.len() >= header_end + length).then(|| buf[header_end..header_end + length].to_vec())
}
