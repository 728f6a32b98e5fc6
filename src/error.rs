//! Error types and HTTP error response handling.
//!
//! This module defines every failure the ledger can report and how each one
//! is converted into an HTTP response with a status code and JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Result alias used throughout the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-wide error type.
///
/// # Error Categories
///
/// - **Business rule failures**: everything except `Database`. The unit of
///   work is rolled back and nothing it touched becomes visible.
/// - **Conflicts**: `ConcurrentUpdate`, raised on lock-wait timeout or on a
///   stale version. Callers may retry.
/// - **Internal failures**: `Database`, any storage error not covered above.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Requested account does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Account not found")]
    AccountNotFound,

    /// An account with this number is already open.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Account already exists")]
    AccountAlreadyExists,

    /// Amount is missing, zero, negative or finer than one cent.
    #[error("Invalid amount")]
    InvalidAmount,

    /// Account has insufficient balance for the requested operation.
    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    #[error("Daily withdrawal limit exceeded")]
    DailyWithdrawalLimitExceeded,

    /// The limit counts transfer principal only, never the fee.
    #[error("Daily transfer limit exceeded")]
    DailyTransferLimitExceeded,

    /// A lock could not be acquired in time or a version check failed.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Concurrent update detected, please try again")]
    ConcurrentUpdate,

    /// Request body or parameters are malformed.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage failed for a reason unrelated to business rules.
    ///
    /// Returns HTTP 500 and hides the details from the client.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl LedgerError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound => "account_not_found",
            LedgerError::AccountAlreadyExists => "account_already_exists",
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::InsufficientBalance => "insufficient_balance",
            LedgerError::SameAccountTransfer => "same_account_transfer",
            LedgerError::DailyWithdrawalLimitExceeded => "daily_withdrawal_limit_exceeded",
            LedgerError::DailyTransferLimitExceeded => "daily_transfer_limit_exceeded",
            LedgerError::ConcurrentUpdate => "concurrent_update",
            LedgerError::InvalidRequest(_) => "invalid_request",
            LedgerError::Database(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::AccountNotFound => StatusCode::NOT_FOUND,
            LedgerError::AccountAlreadyExists | LedgerError::ConcurrentUpdate => {
                StatusCode::CONFLICT
            }
            LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// SQLSTATE codes that mean "someone else holds the row".
///
/// - 55P03 `lock_not_available` (lock_timeout expired)
/// - 40001 `serialization_failure`
/// - 40P01 `deadlock_detected`
const CONFLICT_SQLSTATES: [&str; 3] = ["55P03", "40001", "40P01"];

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if CONFLICT_SQLSTATES.iter().any(|state| *state == code) {
                    return LedgerError::ConcurrentUpdate;
                }
            }
        }
        LedgerError::Database(err)
    }
}

/// Convert LedgerError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "insufficient_balance",
///     "message": "Insufficient balance"
///   }
/// }
/// ```
impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            LedgerError::Database(err) => {
                tracing::error!(error = %err, "internal storage failure");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
