//! Per-account, per-day withdrawal and transfer accumulators.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::money::Money;

/// Running totals for one account on one calendar day.
///
/// Maps to the `daily_limits` table, unique on `(account_number, limit_date)`.
/// Records start at zero and only ever grow.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct DailyLimit {
    pub account_number: String,
    pub limit_date: NaiveDate,
    pub withdrawal_amount: Money,
    pub transfer_amount: Money,
}

impl DailyLimit {
    pub fn new(account_number: impl Into<String>, limit_date: NaiveDate) -> Self {
        Self {
            account_number: account_number.into(),
            limit_date,
            withdrawal_amount: Money::ZERO,
            transfer_amount: Money::ZERO,
        }
    }

    pub fn record_withdrawal(&mut self, amount: Money) {
        self.withdrawal_amount += amount;
    }

    pub fn record_transfer(&mut self, amount: Money) {
        self.transfer_amount += amount;
    }

    /// Storage key of this record.
    pub fn key(&self) -> (String, NaiveDate) {
        (self.account_number.clone(), self.limit_date)
    }
}
