//! Account lifecycle: open, look up, delete.

use crate::error::{LedgerError, LedgerResult};
use crate::models::account::Account;
use crate::services::engine::{LedgerEngine, finish};
use crate::store::{AccountStore, Storage};

impl<S: Storage> LedgerEngine<S> {
    /// Open a zero-balance account.
    ///
    /// # Errors
    ///
    /// - `AccountAlreadyExists`: the number is taken
    pub async fn create_account(&self, account_number: &str) -> LedgerResult<Account> {
        let mut work = self.storage.begin().await?;
        let result = work.insert_account(account_number).await;
        let account = finish(work, "create_account", result).await?;

        tracing::info!(account_number, "account created");
        Ok(account)
    }

    /// Read an account without locking it.
    pub async fn get_account(&self, account_number: &str) -> LedgerResult<Account> {
        self.storage
            .find_account(account_number)
            .await?
            .ok_or(LedgerError::AccountNotFound)
    }

    /// Remove an account regardless of its balance.
    ///
    /// The account is locked first, so a delete never interleaves with a
    /// deposit, withdrawal or transfer on the same account. Ledger rows are
    /// kept.
    pub async fn delete_account(&self, account_number: &str) -> LedgerResult<()> {
        let mut work = self.storage.begin().await?;
        let result = work.remove_account(account_number).await;
        finish(work, "delete_account", result).await?;

        tracing::info!(account_number, "account deleted");
        Ok(())
    }
}
