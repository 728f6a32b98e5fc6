//! Storage abstraction for the ledger.
//!
//! A [`Storage`] hands out [`UnitOfWork`]s. Everything written through a
//! unit of work (account balances, daily limit records, ledger rows) becomes
//! visible together on [`UnitOfWork::commit`], or not at all.
//!
//! Locks taken with `*_for_update` are exclusive and held until the unit of
//! work commits, rolls back or is dropped. Lock waits are bounded; a timeout
//! surfaces as `LedgerError::ConcurrentUpdate`.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::LedgerResult;
use crate::models::account::Account;
use crate::models::daily_limit::DailyLimit;
use crate::models::money::Money;
use crate::models::transaction::{NewTransaction, Transaction};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Offset/limit window over an account's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// Entry point to a storage backend.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    type Work: UnitOfWork;

    /// Start a unit of work.
    async fn begin(&self) -> LedgerResult<Self::Work>;

    /// Read an account without locking it.
    async fn find_account(&self, account_number: &str) -> LedgerResult<Option<Account>>;

    /// Committed ledger rows for an account, newest first (ties by id).
    async fn list_transactions(
        &self,
        account_number: &str,
        page: Option<Page>,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> LedgerResult<()>;

    /// Short name reported by the health endpoint.
    fn backend_name(&self) -> &'static str;
}

/// Keyed account records with pessimistic locks and version checks.
#[async_trait]
pub trait AccountStore: Send {
    /// Insert a zero-balance account. Fails with `AccountAlreadyExists`.
    async fn insert_account(&mut self, account_number: &str) -> LedgerResult<Account>;

    /// Lock an account for the rest of the unit of work and return it.
    async fn get_account_for_update(&mut self, account_number: &str) -> LedgerResult<Account>;

    /// Persist a locked account whose `version` is the one it was read with.
    ///
    /// Returns the stored record with its bumped version. A stale version
    /// fails with `ConcurrentUpdate`.
    async fn update_account(&mut self, account: &Account) -> LedgerResult<Account>;

    /// Remove an account. Fails with `AccountNotFound`.
    async fn remove_account(&mut self, account_number: &str) -> LedgerResult<()>;

    async fn deposit(&mut self, account: &mut Account, amount: Money) -> LedgerResult<()> {
        account.deposit(amount)?;
        *account = self.update_account(account).await?;
        Ok(())
    }

    async fn withdraw(&mut self, account: &mut Account, amount: Money) -> LedgerResult<()> {
        account.withdraw(amount)?;
        *account = self.update_account(account).await?;
        Ok(())
    }
}

/// Per-account, per-day accumulators.
#[async_trait]
pub trait DailyLimitTracker: Send {
    /// Lock and return the record for `(account_number, date)`.
    ///
    /// A missing record comes back zero-initialised and is only stored by a
    /// later `save_daily_limit`.
    async fn get_or_create_for_update(
        &mut self,
        account_number: &str,
        date: NaiveDate,
    ) -> LedgerResult<DailyLimit>;

    async fn save_daily_limit(&mut self, limit: &DailyLimit) -> LedgerResult<()>;

    async fn add_withdrawal(&mut self, limit: &mut DailyLimit, amount: Money) -> LedgerResult<()> {
        limit.record_withdrawal(amount);
        self.save_daily_limit(limit).await
    }

    async fn add_transfer(&mut self, limit: &mut DailyLimit, amount: Money) -> LedgerResult<()> {
        limit.record_transfer(amount);
        self.save_daily_limit(limit).await
    }
}

/// Append-only log of monetary events.
#[async_trait]
pub trait TransactionLedger: Send {
    /// Assign a sequence id and timestamp, then store the row.
    async fn append(&mut self, entry: NewTransaction) -> LedgerResult<Transaction>;
}

/// One atomic unit of work over all three stores.
///
/// Dropping a unit of work without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: AccountStore + DailyLimitTracker + TransactionLedger {
    async fn commit(self) -> LedgerResult<()>;

    async fn rollback(self) -> LedgerResult<()>;
}
