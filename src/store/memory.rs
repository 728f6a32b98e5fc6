//! In-memory storage backend.
//!
//! Committed state lives behind one `RwLock`. A unit of work never writes
//! to it directly: it takes per-key async locks, stages its writes locally
//! and applies them all under a single write guard on commit. Readers
//! therefore see either none or all of a unit of work.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{LedgerError, LedgerResult};
use crate::models::account::Account;
use crate::models::daily_limit::DailyLimit;
use crate::models::transaction::{NewTransaction, Transaction};
use crate::store::{
    AccountStore, DailyLimitTracker, Page, Storage, TransactionLedger, UnitOfWork,
};

type LimitKey = (String, NaiveDate);

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// Exclusive async locks keyed by record identity.
///
/// A slot exists only while someone holds or waits for its key.
struct LockTable<K> {
    slots: Slots<K>,
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn acquire(&self, key: &K, timeout: Duration) -> LedgerResult<KeyGuard<K>> {
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();
        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(KeyGuard {
                slots: Arc::clone(&self.slots),
                key: key.clone(),
                guard: Some(guard),
            }),
            Err(_) => {
                prune(&mut self.slots.lock(), key);
                Err(LedgerError::ConcurrentUpdate)
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Drop a slot nobody else references. Callers hold the `slots` mutex, so
/// no new waiter can clone the slot in between.
fn prune<K: Eq + Hash>(slots: &mut HashMap<K, Arc<AsyncMutex<()>>>, key: &K) {
    if slots
        .get(key)
        .is_some_and(|slot| Arc::strong_count(slot) == 1)
    {
        slots.remove(key);
    }
}

/// Held lock on one key; releasing it prunes the slot when idle.
struct KeyGuard<K: Eq + Hash> {
    slots: Slots<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        drop(self.guard.take());
        prune(&mut slots, &self.key);
    }
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    daily_limits: HashMap<LimitKey, DailyLimit>,
    transactions: Vec<Transaction>,
}

struct Shared {
    tables: RwLock<Tables>,
    account_locks: LockTable<String>,
    limit_locks: LockTable<LimitKey>,
    next_transaction_id: AtomicI64,
    lock_timeout: Duration,
}

/// In-memory storage for tests, development and database-less deployments.
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
}

impl MemoryStorage {
    /// Create an empty store whose lock waits give up after `lock_timeout`.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                account_locks: LockTable::new(),
                limit_locks: LockTable::new(),
                next_transaction_id: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    /// Committed daily limit record, if any.
    pub fn daily_limit(&self, account_number: &str, date: NaiveDate) -> Option<DailyLimit> {
        self.shared
            .tables
            .read()
            .daily_limits
            .get(&(account_number.to_string(), date))
            .cloned()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    type Work = MemoryUnitOfWork;

    async fn begin(&self) -> LedgerResult<MemoryUnitOfWork> {
        Ok(MemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            account_guards: HashMap::new(),
            limit_guards: HashMap::new(),
            base_versions: HashMap::new(),
            accounts: HashMap::new(),
            daily_limits: HashMap::new(),
            transactions: Vec::new(),
        })
    }

    async fn find_account(&self, account_number: &str) -> LedgerResult<Option<Account>> {
        Ok(self.shared.tables.read().accounts.get(account_number).cloned())
    }

    async fn list_transactions(
        &self,
        account_number: &str,
        page: Option<Page>,
    ) -> LedgerResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .shared
            .tables
            .read()
            .transactions
            .iter()
            .filter(|txn| txn.account_number == account_number)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(match page {
            Some(page) => rows
                .into_iter()
                .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        })
    }

    async fn ping(&self) -> LedgerResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Unit of work over [`MemoryStorage`].
///
/// Holds its lock guards and staged writes; both are released on drop.
pub struct MemoryUnitOfWork {
    shared: Arc<Shared>,
    account_guards: HashMap<String, KeyGuard<String>>,
    limit_guards: HashMap<LimitKey, KeyGuard<LimitKey>>,
    /// Committed version of each locked account when first seen; `None` if
    /// it did not exist.
    base_versions: HashMap<String, Option<i64>>,
    /// Staged account state; `None` marks a removal.
    accounts: HashMap<String, Option<Account>>,
    daily_limits: HashMap<LimitKey, DailyLimit>,
    transactions: Vec<Transaction>,
}

impl MemoryUnitOfWork {
    async fn lock_account(&mut self, account_number: &str) -> LedgerResult<()> {
        if self.account_guards.contains_key(account_number) {
            return Ok(());
        }
        let key = account_number.to_string();
        let guard = self
            .shared
            .account_locks
            .acquire(&key, self.shared.lock_timeout)
            .await?;
        tracing::debug!(account_number, "account lock acquired");
        self.account_guards.insert(key, guard);
        Ok(())
    }

    /// Current view of a locked account: staged if touched, else committed.
    fn view_account(&mut self, account_number: &str) -> Option<Account> {
        if let Some(staged) = self.accounts.get(account_number) {
            return staged.clone();
        }
        let committed = self
            .shared
            .tables
            .read()
            .accounts
            .get(account_number)
            .cloned();
        self.base_versions
            .entry(account_number.to_string())
            .or_insert_with(|| committed.as_ref().map(|account| account.version));
        committed
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    async fn insert_account(&mut self, account_number: &str) -> LedgerResult<Account> {
        self.lock_account(account_number).await?;
        if self.view_account(account_number).is_some() {
            return Err(LedgerError::AccountAlreadyExists);
        }
        let account = Account::open(account_number);
        self.accounts
            .insert(account_number.to_string(), Some(account.clone()));
        Ok(account)
    }

    async fn get_account_for_update(&mut self, account_number: &str) -> LedgerResult<Account> {
        self.lock_account(account_number).await?;
        self.view_account(account_number)
            .ok_or(LedgerError::AccountNotFound)
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<Account> {
        if !self.account_guards.contains_key(&account.account_number) {
            return Err(LedgerError::ConcurrentUpdate);
        }
        let current = self
            .view_account(&account.account_number)
            .ok_or(LedgerError::AccountNotFound)?;
        if current.version != account.version {
            return Err(LedgerError::ConcurrentUpdate);
        }

        let mut updated = account.clone();
        updated.version += 1;
        updated.updated_at = Utc::now();
        self.accounts
            .insert(updated.account_number.clone(), Some(updated.clone()));
        Ok(updated)
    }

    async fn remove_account(&mut self, account_number: &str) -> LedgerResult<()> {
        self.lock_account(account_number).await?;
        if self.view_account(account_number).is_none() {
            return Err(LedgerError::AccountNotFound);
        }
        self.accounts.insert(account_number.to_string(), None);
        Ok(())
    }
}

#[async_trait]
impl DailyLimitTracker for MemoryUnitOfWork {
    async fn get_or_create_for_update(
        &mut self,
        account_number: &str,
        date: NaiveDate,
    ) -> LedgerResult<DailyLimit> {
        let key = (account_number.to_string(), date);
        if !self.limit_guards.contains_key(&key) {
            let guard = self
                .shared
                .limit_locks
                .acquire(&key, self.shared.lock_timeout)
                .await?;
            self.limit_guards.insert(key.clone(), guard);
        }

        if let Some(staged) = self.daily_limits.get(&key) {
            return Ok(staged.clone());
        }
        let committed = self.shared.tables.read().daily_limits.get(&key).cloned();
        Ok(committed.unwrap_or_else(|| DailyLimit::new(account_number, date)))
    }

    async fn save_daily_limit(&mut self, limit: &DailyLimit) -> LedgerResult<()> {
        let key = limit.key();
        if !self.limit_guards.contains_key(&key) {
            return Err(LedgerError::ConcurrentUpdate);
        }
        self.daily_limits.insert(key, limit.clone());
        Ok(())
    }
}

#[async_trait]
impl TransactionLedger for MemoryUnitOfWork {
    async fn append(&mut self, entry: NewTransaction) -> LedgerResult<Transaction> {
        let id = self
            .shared
            .next_transaction_id
            .fetch_add(1, Ordering::SeqCst);
        let row = entry.record(id, Utc::now());
        self.transactions.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(mut self) -> LedgerResult<()> {
        let mut tables = self.shared.tables.write();

        // Every key we touched is locked, so these can only differ if a
        // writer bypassed the lock table.
        for (account_number, base) in &self.base_versions {
            let committed = tables.accounts.get(account_number).map(|a| a.version);
            if committed != *base {
                return Err(LedgerError::ConcurrentUpdate);
            }
        }

        for (account_number, staged) in self.accounts.drain() {
            match staged {
                Some(account) => {
                    tables.accounts.insert(account_number, account);
                }
                None => {
                    tables.accounts.remove(&account_number);
                }
            }
        }
        tables.daily_limits.extend(self.daily_limits.drain());
        tables.transactions.append(&mut self.transactions);
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::money::Money;

    fn storage() -> MemoryStorage {
        MemoryStorage::new(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_commit() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        work.insert_account("1234567890").await.unwrap();
        assert!(storage.find_account("1234567890").await.unwrap().is_none());

        work.commit().await.unwrap();
        let account = storage.find_account("1234567890").await.unwrap().unwrap();
        assert_eq!(account.balance, Money::ZERO);
        assert_eq!(account.version, 0);
    }

    #[tokio::test]
    async fn dropped_work_discards_writes_and_releases_locks() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        work.insert_account("1234567890").await.unwrap();
        work.commit().await.unwrap();

        {
            let mut work = storage.begin().await.unwrap();
            let mut account = work.get_account_for_update("1234567890").await.unwrap();
            work.deposit(&mut account, Money::from(10)).await.unwrap();
        }

        let mut work = storage.begin().await.unwrap();
        let account = work.get_account_for_update("1234567890").await.unwrap();
        assert_eq!(account.balance, Money::ZERO);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        work.insert_account("1234567890").await.unwrap();
        work.commit().await.unwrap();

        let mut work = storage.begin().await.unwrap();
        let stale = work.get_account_for_update("1234567890").await.unwrap();
        let mut fresh = stale.clone();
        work.deposit(&mut fresh, Money::from(10)).await.unwrap();
        assert_eq!(fresh.version, 1);

        let err = work.update_account(&stale).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentUpdate));
    }

    #[tokio::test]
    async fn update_without_lock_is_refused() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        work.insert_account("1234567890").await.unwrap();
        work.commit().await.unwrap();

        let account = storage.find_account("1234567890").await.unwrap().unwrap();
        let mut work = storage.begin().await.unwrap();
        let err = work.update_account(&account).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentUpdate));
    }

    #[tokio::test]
    async fn lock_wait_times_out() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        work.insert_account("1234567890").await.unwrap();
        work.commit().await.unwrap();

        let mut holder = storage.begin().await.unwrap();
        holder.get_account_for_update("1234567890").await.unwrap();

        let mut waiter = storage.begin().await.unwrap();
        let err = waiter
            .get_account_for_update("1234567890")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentUpdate));

        holder.rollback().await.unwrap();
        waiter.get_account_for_update("1234567890").await.unwrap();
    }

    #[tokio::test]
    async fn lock_slots_are_released_with_their_guards() {
        let storage = storage();
        for n in 0..50 {
            let mut work = storage.begin().await.unwrap();
            let err = work
                .get_account_for_update(&format!("99999{n:05}"))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::AccountNotFound));
        }
        assert_eq!(storage.shared.account_locks.len(), 0);

        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut work = storage.begin().await.unwrap();
        work.insert_account("1234567890").await.unwrap();
        work.get_or_create_for_update("1234567890", date).await.unwrap();
        assert_eq!(storage.shared.account_locks.len(), 1);
        assert_eq!(storage.shared.limit_locks.len(), 1);

        work.commit().await.unwrap();
        assert_eq!(storage.shared.account_locks.len(), 0);
        assert_eq!(storage.shared.limit_locks.len(), 0);
    }

    #[tokio::test]
    async fn timed_out_waiter_leaves_only_the_holders_slot() {
        let storage = storage();
        let mut holder = storage.begin().await.unwrap();
        holder.insert_account("1234567890").await.unwrap();

        let mut waiter = storage.begin().await.unwrap();
        waiter
            .get_account_for_update("1234567890")
            .await
            .unwrap_err();
        assert_eq!(storage.shared.account_locks.len(), 1);

        holder.rollback().await.unwrap();
        assert_eq!(storage.shared.account_locks.len(), 0);
    }

    #[tokio::test]
    async fn huge_page_offsets_return_nothing() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        let account = work.insert_account("1234567890").await.unwrap();
        work.append(NewTransaction::deposit(&account, Money::from(1)))
            .await
            .unwrap();
        work.commit().await.unwrap();

        let page = Page { offset: u64::MAX, limit: u64::MAX };
        let rows = storage
            .list_transactions("1234567890", Some(page))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn fresh_daily_limit_is_not_stored_until_saved() {
        let storage = storage();
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let mut work = storage.begin().await.unwrap();
        let limit = work.get_or_create_for_update("1234567890", date).await.unwrap();
        assert_eq!(limit.withdrawal_amount, Money::ZERO);
        work.commit().await.unwrap();
        assert!(storage.daily_limit("1234567890", date).is_none());

        let mut work = storage.begin().await.unwrap();
        let mut limit = work.get_or_create_for_update("1234567890", date).await.unwrap();
        work.add_withdrawal(&mut limit, Money::from(500)).await.unwrap();
        work.commit().await.unwrap();
        assert_eq!(
            storage.daily_limit("1234567890", date).unwrap().withdrawal_amount,
            Money::from(500)
        );
    }

    #[tokio::test]
    async fn history_is_newest_first_and_pageable() {
        let storage = storage();
        let mut work = storage.begin().await.unwrap();
        let mut account = work.insert_account("1234567890").await.unwrap();
        for amount in 1..=3 {
            account.balance += Money::from(amount);
            work.append(NewTransaction::deposit(&account, Money::from(amount)))
                .await
                .unwrap();
        }
        work.commit().await.unwrap();

        let rows = storage.list_transactions("1234567890", None).await.unwrap();
        let amounts: Vec<Money> = rows.iter().map(|row| row.amount).collect();
        assert_eq!(amounts, vec![Money::from(3), Money::from(2), Money::from(1)]);

        let page = Page { offset: 1, limit: 1 };
        let rows = storage
            .list_transactions("1234567890", Some(page))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Money::from(2));
    }
}
