//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::contract::ContractConfig;
use crate::network::TargetNetwork;
use crate::streak::DEFAULT_FLAME_CAPACITY;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Most decimals an EVM token amount can be rendered with
const MAX_DECIMALS: u32 = 77;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: TargetNetwork,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wallet endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint of the wallet; empty means no wallet
    #[serde(default = "default_wallet_endpoint")]
    pub endpoint: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// How often to poll for account / chain changes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How long to wait on requests the user has to approve
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_ms: u64,
}

fn default_wallet_endpoint() -> Option<String> {
    Some("http://127.0.0.1:1248".to_string())
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_prompt_timeout() -> u64 {
    300_000
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            endpoint: default_wallet_endpoint(),
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
            poll_interval_ms: default_poll_interval(),
            prompt_timeout_ms: default_prompt_timeout(),
        }
    }
}

/// Derived-view configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_flame_capacity")]
    pub flame_capacity: usize,

    /// Countdown recompute interval
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
}

fn default_flame_capacity() -> usize {
    DEFAULT_FLAME_CAPACITY
}

fn default_tick() -> u64 {
    1000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            flame_capacity: default_flame_capacity(),
            tick_ms: default_tick(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        config.normalize();

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `explicit` if given, else the first default location found
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("hirys").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Ok(Self::from_env())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("HIRYS_WALLET_URL") {
            self.wallet.endpoint = Some(url);
        }
        if let Ok(address) = std::env::var("HIRYS_CONTRACT_ADDRESS") {
            self.contract.address = address;
        }
        if let Ok(rpc) = std::env::var("HIRYS_CHAIN_RPC") {
            self.network.rpc_url = rpc;
        }
        if let Ok(level) = std::env::var("HIRYS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("HIRYS_LOG_FORMAT") {
            self.logging.format = format;
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        if self
            .wallet
            .endpoint
            .as_deref()
            .is_some_and(|e| e.trim().is_empty())
        {
            self.wallet.endpoint = None;
        }
        if self.display.tick_ms == 0 {
            self.display.tick_ms = default_tick();
        }
        if self.network.currency.decimals > MAX_DECIMALS {
            tracing::warn!(
                decimals = self.network.currency.decimals,
                "Currency decimals out of range, using 18"
            );
            self.network.currency.decimals = 18;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Hirys Streak Configuration
#
# Environment variables override these settings:
# - HIRYS_WALLET_URL
# - HIRYS_CONTRACT_ADDRESS
# - HIRYS_CHAIN_RPC
# - HIRYS_LOG_LEVEL
# - HIRYS_LOG_FORMAT

[network]
# Target chain
chain_id = 1270
name = "Irys Testnet"
rpc_url = "https://testnet-rpc.irys.xyz/v1/execution-rpc"
explorer_url = "https://testnet-explorer.irys.xyz"
faucet_url = "https://irys.xyz/faucet"

# Ask the wallet to add the chain when it doesn't know it
allow_add_chain = true

[network.currency]
name = "IRYS"
symbol = "IRYS"
decimals = 18

[wallet]
# JSON-RPC endpoint of your wallet (empty = no wallet)
endpoint = "http://127.0.0.1:1248"

# Request timeout (ms) and retry attempts for transport failures
request_timeout_ms = 10000
max_retries = 3

# How often to check for account / chain changes (ms)
poll_interval_ms = 2000

# How long to wait for you to approve a request in the wallet (ms).
# These requests are never retried.
prompt_timeout_ms = 300000

[contract]
# Check-in registry address
address = "0x229D336624b807489CcB034Be5F8c967205c1C1a"

# How long to wait for a check-in to be mined (seconds)
confirmation_timeout_secs = 120

# Receipt polling interval (ms)
receipt_poll_ms = 1500

# Message sent when none is given
default_message = "Hirys Datapunks"

[display]
# Number of flame positions
flame_capacity = 10

# Countdown refresh interval (ms)
tick_ms = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
