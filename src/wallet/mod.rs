//! Wallet Session
//!
//! Everything the client knows about the connected wallet.
//!
//! ## Architecture
//!
//! - **WalletProvider**: the wallet collaborator (accounts, chain, balance,
//!   chain switching, change notifications)
//! - **SessionManager**: owns the `Session`, refreshes it from the provider
//!   and listens for wallet events
//! - **RpcWallet**: `WalletProvider` over a JSON-RPC wallet endpoint
//!
//! ## Data Flow
//!
//! 1. `connect()` asks the wallet for accounts and fixes the chain
//! 2. `refresh_session()` re-reads accounts, chain and balance silently
//! 3. Wallet events (accounts / chain changed) trigger a refresh
//! 4. Consumers watch the published `Session`

mod provider;
mod rpc;
mod session;

pub use provider::{WalletEvent, WalletProvider};
pub use rpc::RpcWallet;
pub use session::{Session, SessionManager};
