//! Daily limit and fee policy.

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::daily_limit::DailyLimit;
use crate::models::money::Money;

/// Limits and fee rate applied by the ledger engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerPolicy {
    /// Cap on one account's withdrawals per calendar day
    pub daily_withdrawal_limit: Money,

    /// Cap on one account's transfer principal per calendar day
    pub daily_transfer_limit: Money,

    /// Fraction of the principal charged on every transfer
    pub transfer_fee_rate: Decimal,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            daily_withdrawal_limit: Money::from(1_000_000),
            daily_transfer_limit: Money::from(3_000_000),
            transfer_fee_rate: Decimal::new(1, 2),
        }
    }
}

impl LedgerPolicy {
    /// Fee for a transfer of `amount`, rounded half-up to the cent.
    pub fn transfer_fee(&self, amount: Money) -> Money {
        amount.percentage(self.transfer_fee_rate)
    }

    pub fn check_withdrawal(&self, limit: &DailyLimit, amount: Money) -> LedgerResult<()> {
        match limit.withdrawal_amount.checked_add(amount) {
            Some(total) if total <= self.daily_withdrawal_limit => Ok(()),
            _ => Err(LedgerError::DailyWithdrawalLimitExceeded),
        }
    }

    /// Only the principal counts toward the limit.
    pub fn check_transfer(&self, limit: &DailyLimit, amount: Money) -> LedgerResult<()> {
        match limit.transfer_amount.checked_add(amount) {
            Some(total) if total <= self.daily_transfer_limit => Ok(()),
            _ => Err(LedgerError::DailyTransferLimitExceeded),
        }
    }
}
