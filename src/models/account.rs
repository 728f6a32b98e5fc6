//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: stored record holding a balance and a version counter
//! - `CreateAccountRequest`: Request body for opening accounts
//! - `AccountResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::money::Money;

/// Shortest accepted account number.
pub const ACCOUNT_NUMBER_MIN_LEN: usize = 10;
/// Longest accepted account number.
pub const ACCOUNT_NUMBER_MAX_LEN: usize = 20;

/// Represents an account record.
///
/// # Table
///
/// Maps to the `accounts` table, keyed by `account_number`.
///
/// # Invariants
///
/// - `balance` is never negative
/// - `version` increases by one on every persisted mutation
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Digit string identifying the account, immutable once created
    pub account_number: String,

    /// Current balance
    pub balance: Money,

    /// Optimistic version, checked on every update
    pub version: i64,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of last balance update
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A freshly opened account with a zero balance.
    pub fn open(account_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            account_number: account_number.into(),
            balance: Money::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Increase the balance in place.
    ///
    /// A balance that would pass [`Money::MAX`] is refused as `InvalidAmount`.
    pub fn deposit(&mut self, amount: Money) -> LedgerResult<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount)?;
        Ok(())
    }

    /// Decrease the balance in place, refusing to go below zero.
    pub fn withdraw(&mut self, amount: Money) -> LedgerResult<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance)?;
        Ok(())
    }
}

/// Check that an account number is 10-20 ASCII digits.
pub fn validate_account_number(account_number: &str) -> LedgerResult<()> {
    let len = account_number.len();
    if !(ACCOUNT_NUMBER_MIN_LEN..=ACCOUNT_NUMBER_MAX_LEN).contains(&len)
        || !account_number.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(LedgerError::InvalidRequest(format!(
            "Account number must be {ACCOUNT_NUMBER_MIN_LEN}-{ACCOUNT_NUMBER_MAX_LEN} digits"
        )));
    }
    Ok(())
}

/// Request body for opening a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_number": "1234567890"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub account_number: String,
}

/// Response body for account endpoints.
///
/// ```json
/// {
///   "account_number": "1234567890",
///   "balance": "500000.00",
///   "created_at": "2025-12-20T10:00:00Z",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_number: String,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert a stored Account to an AccountResponse.
///
/// The version counter is internal and is not exposed.
impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_number: account.account_number,
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
