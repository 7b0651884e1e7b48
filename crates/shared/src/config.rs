//! Application configuration management.

use serde::Deserialize;
use std::collections::HashMap;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Ledger engine configuration.
    pub ledger: LedgerConfig,
    /// Bootstrap configuration (chart of accounts seeding).
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Maximum time to wait for an account or wallet lock, in milliseconds.
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
    /// Number of internal retries for lock-timeout failures before
    /// surfacing the error to the caller.
    #[serde(default = "default_posting_retries")]
    pub posting_retries: u32,
    /// ISO 4217 currency code all amounts are denominated in.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_lock_wait_ms() -> u64 {
    2_000
}

fn default_posting_retries() -> u32 {
    3
}

fn default_currency() -> String {
    "NGN".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_wait_ms: default_lock_wait_ms(),
            posting_retries: default_posting_retries(),
            currency: default_currency(),
        }
    }
}

/// Bootstrap configuration for seeding the chart of accounts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    /// Accounts to create at startup if they do not exist yet.
    #[serde(default)]
    pub accounts: Vec<BootstrapAccount>,
    /// Wallet liability account codes, keyed by owner type
    /// (patient, specialist, pharmacy, platform).
    #[serde(default)]
    pub wallet_accounts: HashMap<String, String>,
    /// The operating cash account debited/credited by platform funding.
    #[serde(default)]
    pub operating_account: Option<String>,
}

/// A single account to seed at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAccount {
    /// Account code, e.g. "1000-CASH".
    pub code: String,
    /// Human-readable account name.
    pub name: String,
    /// Account type: asset, liability, equity, revenue, expense.
    #[serde(rename = "type")]
    pub account_type: String,
    /// Optional minimum balance (in minor units, normal-balance sense)
    /// the account may not cross.
    pub floor: Option<i64>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CURAFIN").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
