//! PostgreSQL storage backend.
//!
//! A unit of work is one database transaction. Row locks come from
//! `SELECT ... FOR UPDATE`, and `SET LOCAL lock_timeout` bounds every lock
//! wait so a blocked request fails with `ConcurrentUpdate` instead of
//! hanging. Dropping the transaction without commit rolls it back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Postgres, Transaction as DbTransaction};

use crate::db::DbPool;
use crate::error::{LedgerError, LedgerResult};
use crate::models::account::Account;
use crate::models::daily_limit::DailyLimit;
use crate::models::money::Money;
use crate::models::transaction::{NewTransaction, Transaction};
use crate::store::{
    AccountStore, DailyLimitTracker, Page, Storage, TransactionLedger, UnitOfWork,
};

const ACCOUNT_COLUMNS: &str = "account_number, balance, version, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, account_number, transaction_type, amount, balance_after, \
     counterparty_account_number, fee, description, created_at";

/// Raw `transactions` row; the type column is stored as text.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    account_number: String,
    transaction_type: String,
    amount: Money,
    balance_after: Money,
    counterparty_account_number: Option<String>,
    fee: Option<Money>,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            account_number: row.account_number,
            transaction_type: row.transaction_type.parse()?,
            amount: row.amount,
            balance_after: row.balance_after,
            counterparty_account_number: row.counterparty_account_number,
            fee: row.fee,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// `SET LOCAL` statement bounding lock waits for one transaction.
///
/// SET cannot take bind parameters; the value is an integer we own. Postgres
/// reads `0` as "wait forever", so sub-millisecond timeouts round up to 1ms.
fn lock_timeout_statement(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis().max(1))
}

/// `LIMIT`/`OFFSET` binds for a history page. `LIMIT NULL` means no limit;
/// values past `i64::MAX` saturate so the query yields an empty page.
fn page_bounds(page: Option<Page>) -> (Option<i64>, i64) {
    match page {
        Some(page) => (
            Some(i64::try_from(page.limit).unwrap_or(i64::MAX)),
            i64::try_from(page.offset).unwrap_or(i64::MAX),
        ),
        None => (None, 0),
    }
}

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
    lock_timeout: Duration,
}

impl PgStorage {
    pub fn new(pool: DbPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl Storage for PgStorage {
    type Work = PgUnitOfWork;

    async fn begin(&self) -> LedgerResult<PgUnitOfWork> {
        let mut tx = self.pool.begin().await?;

        let statement = lock_timeout_statement(self.lock_timeout);
        sqlx::query(&statement).execute(&mut *tx).await?;

        Ok(PgUnitOfWork { tx })
    }

    async fn find_account(&self, account_number: &str) -> LedgerResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1"
        ))
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn list_transactions(
        &self,
        account_number: &str,
        page: Option<Page>,
    ) -> LedgerResult<Vec<Transaction>> {
        let (limit, offset) = page_bounds(page);

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE account_number = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(account_number)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn ping(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Unit of work over [`PgStorage`]: one open database transaction.
pub struct PgUnitOfWork {
    tx: DbTransaction<'static, Postgres>,
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn insert_account(&mut self, account_number: &str) -> LedgerResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (account_number, balance, version)
            VALUES ($1, 0, 0)
            ON CONFLICT (account_number) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account_number)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(LedgerError::AccountAlreadyExists)
    }

    async fn get_account_for_update(&mut self, account_number: &str) -> LedgerResult<Account> {
        // FOR UPDATE holds the row until this transaction ends
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1 FOR UPDATE"
        ))
        .bind(account_number)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(LedgerError::AccountNotFound)
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<Account> {
        // Zero rows means the version moved underneath us
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET balance = $1,
                version = version + 1,
                updated_at = NOW()
            WHERE account_number = $2 AND version = $3
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.balance)
        .bind(&account.account_number)
        .bind(account.version)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(LedgerError::ConcurrentUpdate)
    }

    async fn remove_account(&mut self, account_number: &str) -> LedgerResult<()> {
        self.get_account_for_update(account_number).await?;

        sqlx::query("DELETE FROM accounts WHERE account_number = $1")
            .bind(account_number)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl DailyLimitTracker for PgUnitOfWork {
    async fn get_or_create_for_update(
        &mut self,
        account_number: &str,
        date: NaiveDate,
    ) -> LedgerResult<DailyLimit> {
        let existing = sqlx::query_as::<_, DailyLimit>(
            r#"
            SELECT account_number, limit_date, withdrawal_amount, transfer_amount
            FROM daily_limits
            WHERE account_number = $1 AND limit_date = $2
            FOR UPDATE
            "#,
        )
        .bind(account_number)
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(existing.unwrap_or_else(|| DailyLimit::new(account_number, date)))
    }

    async fn save_daily_limit(&mut self, limit: &DailyLimit) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_limits (account_number, limit_date, withdrawal_amount, transfer_amount)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_number, limit_date)
            DO UPDATE SET withdrawal_amount = EXCLUDED.withdrawal_amount,
                          transfer_amount = EXCLUDED.transfer_amount
            "#,
        )
        .bind(&limit.account_number)
        .bind(limit.limit_date)
        .bind(limit.withdrawal_amount)
        .bind(limit.transfer_amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TransactionLedger for PgUnitOfWork {
    async fn append(&mut self, entry: NewTransaction) -> LedgerResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions (
                account_number,
                transaction_type,
                amount,
                balance_after,
                counterparty_account_number,
                fee,
                description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(&entry.account_number)
        .bind(entry.transaction_type.as_str())
        .bind(entry.amount)
        .bind(entry.balance_after)
        .bind(&entry.counterparty_account_number)
        .bind(entry.fee)
        .bind(&entry.description)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
