//! The ledger engine: coordinates the account store, the daily limit tracker
//! and the transaction ledger inside one unit of work per operation.

use std::sync::Arc;

use crate::error::LedgerResult;
use crate::services::clock::{Clock, SystemClock};
use crate::services::policy::LedgerPolicy;
use crate::store::{Storage, UnitOfWork};

/// Owns no data of its own; every operation borrows a unit of work from the
/// storage backend and commits or rolls it back before returning.
pub struct LedgerEngine<S> {
    pub(crate) storage: S,
    pub(crate) policy: LedgerPolicy,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<S: Storage> LedgerEngine<S> {
    pub fn new(storage: S, policy: LedgerPolicy) -> Self {
        Self {
            storage,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock that decides which day a limit record belongs to.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }
}

/// Commit on success, roll back on failure.
///
/// A failed rollback is logged and the original error is returned; the
/// backend discards the writes either way.
pub(crate) async fn finish<W: UnitOfWork, T>(
    work: W,
    operation: &'static str,
    result: LedgerResult<T>,
) -> LedgerResult<T> {
    match result {
        Ok(value) => {
            work.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(operation, error = %err, "unit of work rolled back");
            if let Err(rollback_err) = work.rollback().await {
                tracing::error!(operation, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
