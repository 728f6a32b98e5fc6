//! Transaction service - core business logic for money movement.
//!
//! This service handles:
//! - Deposits, withdrawals and fee-bearing transfers
//! - Daily withdrawal and transfer limits
//! - Lock ordering across the two accounts of a transfer
//! - Transaction history
//!
//! # Atomicity Guarantees
//!
//! Each operation runs in one unit of work. Every validation happens before
//! the first balance mutation; any error rolls the whole unit back, so no
//! caller ever observes a partially applied operation.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::money::Money;
use crate::models::transaction::{NewTransaction, Transaction, TransferResult};
use crate::services::engine::{LedgerEngine, finish};
use crate::store::{AccountStore, DailyLimitTracker, Page, Storage, TransactionLedger};

/// Order in which the two accounts of a transfer are locked.
///
/// Every path that locks two accounts goes through here, so concurrent
/// transfers over the same pair always wait in the same order and cannot
/// form a cycle.
pub fn lock_order<'a>(source: &'a str, target: &'a str) -> (&'a str, &'a str) {
    if source < target {
        (source, target)
    } else {
        (target, source)
    }
}

impl<S: Storage> LedgerEngine<S> {
    /// Add money to an account.
    ///
    /// # Process
    ///
    /// 1. Lock the account
    /// 2. Validate the amount
    /// 3. Increase the balance
    /// 4. Append a DEPOSIT row
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`: Account doesn't exist
    /// - `InvalidAmount`: Amount is zero, negative or below one cent
    pub async fn deposit(&self, account_number: &str, amount: Decimal) -> LedgerResult<Transaction> {
        let mut work = self.storage.begin().await?;
        let result = async {
            let mut account = work.get_account_for_update(account_number).await?;
            let amount = Money::amount(amount)?;
            work.deposit(&mut account, amount).await?;
            work.append(NewTransaction::deposit(&account, amount)).await
        }
        .await;
        let entry = finish(work, "deposit", result).await?;

        tracing::info!(account_number, amount = %entry.amount, "deposit completed");
        Ok(entry)
    }

    /// Remove money from an account.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`: Account doesn't exist
    /// - `InvalidAmount`: Amount is zero, negative or below one cent
    /// - `DailyWithdrawalLimitExceeded`: today's withdrawals would pass the cap
    /// - `InsufficientBalance`: balance is lower than the amount
    pub async fn withdraw(&self, account_number: &str, amount: Decimal) -> LedgerResult<Transaction> {
        let today = self.clock.today();
        let mut work = self.storage.begin().await?;
        let result = async {
            let mut account = work.get_account_for_update(account_number).await?;
            let amount = Money::amount(amount)?;

            let mut limit = work.get_or_create_for_update(account_number, today).await?;
            self.policy.check_withdrawal(&limit, amount)?;
            if account.balance < amount {
                return Err(LedgerError::InsufficientBalance);
            }

            work.withdraw(&mut account, amount).await?;
            work.add_withdrawal(&mut limit, amount).await?;
            work.append(NewTransaction::withdrawal(&account, amount)).await
        }
        .await;
        let entry = finish(work, "withdraw", result).await?;

        tracing::info!(account_number, amount = %entry.amount, "withdrawal completed");
        Ok(entry)
    }

    /// Move money between two accounts, charging the source a fee.
    ///
    /// # Process
    ///
    /// 1. Reject same-account transfers before touching storage
    /// 2. Lock both accounts in [`lock_order`]
    /// 3. Lock the source's daily limit record and check the principal
    /// 4. Compute fee and total deduction
    /// 5. Check the source balance covers principal plus fee
    /// 6. Debit source, credit target, record the principal
    /// 7. Append TRANSFER_OUT (with fee) and TRANSFER_IN rows
    ///
    /// # Errors
    ///
    /// - `SameAccountTransfer`: source and target are equal
    /// - `InvalidAmount`: Amount is zero, negative or below one cent
    /// - `AccountNotFound`: either account doesn't exist
    /// - `DailyTransferLimitExceeded`: today's principal would pass the cap
    /// - `InsufficientBalance`: source cannot cover principal plus fee
    pub async fn transfer(
        &self,
        source_account_number: &str,
        target_account_number: &str,
        amount: Decimal,
    ) -> LedgerResult<TransferResult> {
        if source_account_number == target_account_number {
            return Err(LedgerError::SameAccountTransfer);
        }
        let amount = Money::amount(amount)?;
        let today = self.clock.today();

        let mut work = self.storage.begin().await?;
        let result = async {
            let (first, second) = lock_order(source_account_number, target_account_number);
            let first_account = work.get_account_for_update(first).await?;
            let second_account = work.get_account_for_update(second).await?;
            let (mut source, mut target) = if first == source_account_number {
                (first_account, second_account)
            } else {
                (second_account, first_account)
            };

            let mut limit = work
                .get_or_create_for_update(source_account_number, today)
                .await?;
            self.policy.check_transfer(&limit, amount)?;

            let fee = self.policy.transfer_fee(amount);
            let total_deduction = amount
                .checked_add(fee)
                .ok_or(LedgerError::InvalidAmount)?;
            if source.balance < total_deduction {
                return Err(LedgerError::InsufficientBalance);
            }

            work.withdraw(&mut source, total_deduction).await?;
            work.deposit(&mut target, amount).await?;
            work.add_transfer(&mut limit, amount).await?;

            work.append(NewTransaction::transfer_out(
                &source,
                amount,
                fee,
                target_account_number,
            ))
            .await?;
            work.append(NewTransaction::transfer_in(
                &target,
                amount,
                source_account_number,
            ))
            .await?;

            Ok::<_, LedgerError>(TransferResult {
                source_account_number: source.account_number,
                target_account_number: target.account_number,
                amount,
                fee,
                total_deduction,
                source_balance_after: source.balance,
                target_balance_after: target.balance,
                transferred_at: Utc::now(),
            })
        }
        .await;
        let summary = finish(work, "transfer", result).await?;

        tracing::info!(
            from = source_account_number,
            to = target_account_number,
            amount = %summary.amount,
            fee = %summary.fee,
            "transfer completed"
        );
        Ok(summary)
    }

    /// Ledger rows for an account, newest first.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`: Account doesn't exist
    pub async fn history(
        &self,
        account_number: &str,
        page: Option<Page>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.get_account(account_number).await?;
        self.storage.list_transactions(account_number, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_order_is_lexicographic_and_symmetric() {
        assert_eq!(lock_order("1234567890", "0987654321"), ("0987654321", "1234567890"));
        assert_eq!(lock_order("0987654321", "1234567890"), ("0987654321", "1234567890"));
        // string order, not numeric order
        assert_eq!(lock_order("9000000000", "10000000000"), ("10000000000", "9000000000"));
    }
}
