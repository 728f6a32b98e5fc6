//! Ledger service: per-account balances, an append-only transaction log,
//! daily withdrawal/transfer limits and a transfer fee.
//!
//! # Architecture
//!
//! - **Engine**: [`services::LedgerEngine`] runs every deposit, withdrawal and
//!   transfer as one unit of work over a [`store::Storage`] backend
//! - **Storage**: PostgreSQL via sqlx, or an in-memory backend with the same
//!   locking and commit semantics
//! - **Money**: exact two-digit decimals ([`models::money::Money`])
//! - **HTTP**: axum routes in [`app::router`]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use models::money::Money;
pub use services::{LedgerEngine, LedgerPolicy};
pub use store::{MemoryStorage, PgStorage, Storage};
