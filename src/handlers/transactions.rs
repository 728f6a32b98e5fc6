//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions/deposit - Add money to an account
//! - POST /api/v1/transactions/withdraw - Remove money from an account
//! - POST /api/v1/transactions/transfer - Move money between accounts
//! - GET /api/v1/transactions/history/{account_number} - List an account's transactions

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    error::LedgerError,
    models::transaction::{
        DepositRequest, HistoryQuery, Transaction, TransferRequest, TransferResult,
        WithdrawRequest,
    },
    services::LedgerEngine,
    store::Storage,
};

/// Deposit into an account.
///
/// # Request Body
///
/// ```json
/// {
///   "account_number": "1234567890",
///   "amount": "500000"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "id": 1,
///   "account_number": "1234567890",
///   "transaction_type": "DEPOSIT",
///   "amount": "500000.00",
///   "balance_after": "500000.00",
///   "counterparty_account_number": null,
///   "fee": null,
///   "description": "Deposit",
///   "created_at": "2025-12-21T16:00:00Z"
/// }
/// ```
pub async fn deposit<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<Transaction>, LedgerError> {
    let amount = request.amount.ok_or(LedgerError::InvalidAmount)?;

    let transaction = engine.deposit(&request.account_number, amount).await?;

    Ok(Json(transaction))
}

/// Withdraw from an account.
///
/// # Validation
///
/// - Account must have sufficient balance
/// - Today's withdrawals must stay within the daily limit
pub async fn withdraw<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<Transaction>, LedgerError> {
    let amount = request.amount.ok_or(LedgerError::InvalidAmount)?;

    let transaction = engine.withdraw(&request.account_number, amount).await?;

    Ok(Json(transaction))
}

/// Transfer money between accounts.
///
/// # Atomicity
///
/// Both accounts are updated in a single unit of work.
/// Either both succeed or both fail.
///
/// # Response (200)
///
/// ```json
/// {
///   "source_account_number": "1234567890",
///   "target_account_number": "0987654321",
///   "amount": "100000.00",
///   "fee": "1000.00",
///   "total_deduction": "101000.00",
///   "source_balance_after": "299000.00",
///   "target_balance_after": "100000.00",
///   "transferred_at": "2025-12-21T16:00:00Z"
/// }
/// ```
pub async fn transfer<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResult>, LedgerError> {
    let amount = request.amount.ok_or(LedgerError::InvalidAmount)?;

    let summary = engine
        .transfer(
            &request.source_account_number,
            &request.target_account_number,
            amount,
        )
        .await?;

    Ok(Json(summary))
}

/// Transaction history for an account, newest first.
///
/// Optional `?page=<n>&size=<m>` query parameters select one page.
pub async fn history<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Path(account_number): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Transaction>>, LedgerError> {
    let transactions = engine.history(&account_number, query.to_page()).await?;

    Ok(Json(transactions))
}
