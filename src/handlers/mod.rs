//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls into the ledger engine
//! 3. Returns HTTP response (JSON, status code)

/// Account management endpoints
pub mod accounts;
/// Health check endpoint
pub mod health;
/// Deposit, withdrawal, transfer and history endpoints
pub mod transactions;
