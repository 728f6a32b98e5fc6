//! Data models representing stored entities and API payloads.

/// Ledger account model
pub mod account;
/// Per-day accumulators used for limit checks
pub mod daily_limit;
/// Fixed-point currency amounts
pub mod money;
/// Ledger rows and transaction requests
pub mod transaction;
