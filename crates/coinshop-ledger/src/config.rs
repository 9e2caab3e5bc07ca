//! Ledger configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the ledger can start with zero
//! configuration for local development.

use std::path::PathBuf;
use std::time::Duration;

use coinshop_shared::constants::{
    DATABASE_FILE_NAME, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_IN_FLIGHT, DEFAULT_STARTING_BALANCE,
};
use coinshop_shared::Coins;
use coinshop_store::Store;

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: platform data directory, falling back to `./coinshop.db`.
    pub database_path: PathBuf,

    /// Maximum number of ledger operations executing at once.
    /// Env: `LEDGER_MAX_IN_FLIGHT`
    /// Default: `50`
    pub max_in_flight: usize,

    /// How long an operation may wait for an admission slot.
    /// Env: `LEDGER_ACQUIRE_TIMEOUT_MS` (`0` or unset = wait forever)
    /// Default: none.
    pub acquire_timeout: Option<Duration>,

    /// How long a connection waits for another writer's lock.
    /// Env: `SQLITE_BUSY_TIMEOUT_MS`
    /// Default: `5000`
    pub busy_timeout: Duration,

    /// Balance of a newly created account.
    /// Env: `STARTING_BALANCE`
    /// Default: `1000`
    pub starting_balance: Coins,

    /// Whether the provisioning binary inserts the default merchandise.
    /// Env: `SEED_CATALOG` (true/false)
    /// Default: `true`
    pub seed_catalog: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_path: Store::default_path()
                .unwrap_or_else(|_| PathBuf::from(DATABASE_FILE_NAME)),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            acquire_timeout: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            starting_balance: DEFAULT_STARTING_BALANCE,
            seed_catalog: true,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = PathBuf::from(path);
            }
        }

        if let Some(val) = lookup("LEDGER_MAX_IN_FLIGHT") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_in_flight = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid LEDGER_MAX_IN_FLIGHT, using default"
                ),
            }
        }

        if let Some(val) = lookup("LEDGER_ACQUIRE_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(0) => config.acquire_timeout = None,
                Ok(ms) => config.acquire_timeout = Some(Duration::from_millis(ms)),
                Err(e) => tracing::warn!(
                    value = %val,
                    error = %e,
                    "Invalid LEDGER_ACQUIRE_TIMEOUT_MS, waiting without deadline"
                ),
            }
        }

        if let Some(val) = lookup("SQLITE_BUSY_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.busy_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(val) = lookup("STARTING_BALANCE") {
            match val.parse::<Coins>() {
                Ok(n) if n >= 0 => config.starting_balance = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid STARTING_BALANCE, using default"
                ),
            }
        }

        if let Some(val) = lookup("SEED_CATALOG") {
            config.seed_catalog = val != "false" && val != "0";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
