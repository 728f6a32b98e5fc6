//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::money::Money;
use crate::services::policy::LedgerPolicy;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string; in-memory storage when unset
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DAILY_WITHDRAWAL_LIMIT` (optional): defaults to 1000000
/// - `DAILY_TRANSFER_LIMIT` (optional): defaults to 3000000
/// - `TRANSFER_FEE_RATE` (optional): defaults to 0.01
/// - `LOCK_TIMEOUT_MS` (optional): defaults to 5000, 0 is raised to 1
/// - `DB_MAX_CONNECTIONS` (optional): defaults to 5
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_daily_withdrawal_limit")]
    pub daily_withdrawal_limit: Decimal,

    #[serde(default = "default_daily_transfer_limit")]
    pub daily_transfer_limit: Decimal,

    #[serde(default = "default_transfer_fee_rate")]
    pub transfer_fee_rate: Decimal,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
}

fn default_port() -> u16 {
    3000
}

fn default_daily_withdrawal_limit() -> Decimal {
    Decimal::from(1_000_000)
}

fn default_daily_transfer_limit() -> Decimal {
    Decimal::from(3_000_000)
}

fn default_transfer_fee_rate() -> Decimal {
    Decimal::new(1, 2)
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable value cannot be parsed
    /// into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: server_port -> SERVER_PORT
        envy::from_env::<Config>()
    }

    /// Limits and fee rate handed to the ledger engine.
    pub fn policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            daily_withdrawal_limit: Money::from_decimal(self.daily_withdrawal_limit),
            daily_transfer_limit: Money::from_decimal(self.daily_transfer_limit),
            transfer_fee_rate: self.transfer_fee_rate,
        }
    }

    /// Bound on any lock wait, at least one millisecond.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.max(1))
    }
}
