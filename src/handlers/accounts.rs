//! Account management HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/v1/accounts - Open a new account
//! - GET /api/v1/accounts/{account_number} - Get account details
//! - DELETE /api/v1/accounts/{account_number} - Delete an account

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::LedgerError,
    models::account::{AccountResponse, CreateAccountRequest, validate_account_number},
    services::LedgerEngine,
    store::Storage,
};

/// Open a new account.
///
/// # Endpoint
///
/// `POST /api/v1/accounts`
///
/// # Request Body
///
/// ```json
/// {
///   "account_number": "1234567890"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: Returns the created account
/// - **Error (400)**: Account number is not 10-20 digits
/// - **Error (409)**: Account number already taken
pub async fn create_account<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), LedgerError> {
    validate_account_number(&request.account_number)?;

    let account = engine.create_account(&request.account_number).await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Get a specific account.
///
/// # Response
///
/// - **Success (200 OK)**: Returns account details
/// - **Error (404)**: Account not found
pub async fn get_account<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Path(account_number): Path<String>,
) -> Result<Json<AccountResponse>, LedgerError> {
    let account = engine.get_account(&account_number).await?;

    Ok(Json(account.into()))
}

/// Delete an account.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: Account not found
pub async fn delete_account<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
    Path(account_number): Path<String>,
) -> Result<StatusCode, LedgerError> {
    engine.delete_account(&account_number).await?;

    Ok(StatusCode::NO_CONTENT)
}
