//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: immutable ledger row
//! - `NewTransaction`: a row waiting for its sequence id and timestamp
//! - Request types for deposit, withdraw, and transfer operations
//! - `TransferResult`: summary returned by a transfer

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::models::account::Account;
use crate::models::money::Money;
use crate::store::Page;

/// Kind of monetary event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
    /// Reserved. Transfer fees are carried on the `TransferOut` row.
    Fee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::Fee => "FEE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "TRANSFER_OUT" => Ok(TransactionType::TransferOut),
            "TRANSFER_IN" => Ok(TransactionType::TransferIn),
            "FEE" => Ok(TransactionType::Fee),
            other => Err(LedgerError::InvalidRequest(format!(
                "Unknown transaction type: {other}"
            ))),
        }
    }
}

/// Represents a recorded ledger row.
///
/// # Table
///
/// Maps to the `transactions` table. Rows are append-only:
/// - `id` is a store-assigned sequence number
/// - `balance_after` snapshots the account balance right after the event
/// - `counterparty_account_number` is set for transfers only
/// - `fee` is set on `TRANSFER_OUT` rows only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub balance_after: Money,
    pub counterparty_account_number: Option<String>,
    pub fee: Option<Money>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A ledger row before the store has assigned an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub balance_after: Money,
    pub counterparty_account_number: Option<String>,
    pub fee: Option<Money>,
    pub description: String,
}

impl NewTransaction {
    pub fn deposit(account: &Account, amount: Money) -> Self {
        Self {
            account_number: account.account_number.clone(),
            transaction_type: TransactionType::Deposit,
            amount,
            balance_after: account.balance,
            counterparty_account_number: None,
            fee: None,
            description: "Deposit".to_string(),
        }
    }

    pub fn withdrawal(account: &Account, amount: Money) -> Self {
        Self {
            account_number: account.account_number.clone(),
            transaction_type: TransactionType::Withdrawal,
            amount,
            balance_after: account.balance,
            counterparty_account_number: None,
            fee: None,
            description: "Withdrawal".to_string(),
        }
    }

    /// Debit side of a transfer. `amount` is the principal; the fee is
    /// recorded alongside it.
    pub fn transfer_out(source: &Account, amount: Money, fee: Money, target: &str) -> Self {
        Self {
            account_number: source.account_number.clone(),
            transaction_type: TransactionType::TransferOut,
            amount,
            balance_after: source.balance,
            counterparty_account_number: Some(target.to_string()),
            fee: Some(fee),
            description: format!("Transfer to {target}"),
        }
    }

    pub fn transfer_in(target: &Account, amount: Money, source: &str) -> Self {
        Self {
            account_number: target.account_number.clone(),
            transaction_type: TransactionType::TransferIn,
            amount,
            balance_after: target.balance,
            counterparty_account_number: Some(source.to_string()),
            fee: None,
            description: format!("Transfer from {source}"),
        }
    }

    /// Freeze into a ledger row.
    pub fn record(self, id: i64, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            account_number: self.account_number,
            transaction_type: self.transaction_type,
            amount: self.amount,
            balance_after: self.balance_after,
            counterparty_account_number: self.counterparty_account_number,
            fee: self.fee,
            description: self.description,
            created_at,
        }
    }
}

/// Request to deposit money into an account.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_number": "1234567890",
///   "amount": "500000"
/// }
/// ```
///
/// A missing `amount` is rejected as an invalid amount.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account_number: String,
    pub amount: Option<Decimal>,
}

/// Request to withdraw money from an account.
///
/// # Validation
///
/// - Account must have sufficient balance
/// - Amount must be positive
/// - Today's withdrawals plus this amount must stay within the daily limit
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub account_number: String,
    pub amount: Option<Decimal>,
}

/// Request to transfer money between accounts.
///
/// # JSON Example
///
/// ```json
/// {
///   "source_account_number": "1234567890",
///   "target_account_number": "0987654321",
///   "amount": "100000"
/// }
/// ```
///
/// # Atomicity Guarantee
///
/// Both balances, the daily limit record and both ledger rows are written
/// in the same unit of work.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub source_account_number: String,
    pub target_account_number: String,
    pub amount: Option<Decimal>,
}

/// Summary returned for a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub source_account_number: String,
    pub target_account_number: String,
    pub amount: Money,
    pub fee: Money,
    pub total_deduction: Money,
    pub source_balance_after: Money,
    pub target_balance_after: Money,
    pub transferred_at: DateTime<Utc>,
}

/// Paging parameters for the history endpoint, `?page=0&size=20`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl HistoryQuery {
    const DEFAULT_SIZE: u32 = 20;

    /// `None` when neither parameter was supplied.
    pub fn to_page(&self) -> Option<Page> {
        if self.page.is_none() && self.size.is_none() {
            return None;
        }
        let size = self.size.unwrap_or(Self::DEFAULT_SIZE).max(1);
        let page = self.page.unwrap_or(0);
        Some(Page {
            offset: u64::from(page) * u64::from(size),
            limit: u64::from(size),
        })
    }
}
