//! # Hirys Streak
//!
//! Daily on-chain check-in client: keeps a wallet session in sync, makes sure
//! the wallet is on Irys Testnet, submits the daily `sayGM` check-in and
//! derives the streak display (flames, countdown, broken-streak warning).
//!
//! ## Modules
//!
//! - [`wallet`]: wallet provider collaborator and session manager
//! - [`network`]: target chain identity and the network guard
//! - [`contract`]: check-in contract binding
//! - [`streak`]: streak controller, countdown ticker, derived values
//! - [`app`]: wiring and background task lifecycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hirys_streak::{Config, StreakApp};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = StreakApp::from_config(Config::from_env())?;
//!     app.start();
//!
//!     let session = app.connect().await?;
//!     println!("Connected as {:?}", session.address);
//!
//!     app.check_in(Some("gm"), None).await?;
//!     println!("Streak: {}", app.snapshot().streak.streak_count);
//!
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod contract;
pub mod display;
pub mod error;
pub mod network;
pub mod rpc;
pub mod streak;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use app::{AppSnapshot, StreakApp};

pub use config::{Config, ConfigError, DisplayConfig, LoggingConfig, WalletConfig};

pub use contract::{ContractConfig, RpcStreakContract, StreakContract};

pub use error::{ClientError, ClientResult, ProviderError};

pub use network::{AddChainParams, NativeCurrency, NetworkGuard, TargetNetwork};

pub use rpc::{JsonRpcClient, RpcConfig};

pub use streak::{
    derive_countdown, derive_flame_display, is_streak_at_risk, utc_day, CheckInOutcome, Clock,
    CountdownTicker, SkipReason, StreakController, StreakEvent, StreakState, StreakView,
    SubmissionState, SystemClock,
};

pub use types::{Address, TxHash, Wei, U256};

pub use wallet::{RpcWallet, Session, SessionManager, WalletEvent, WalletProvider};
