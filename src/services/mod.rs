//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They open units of work, validate requests against the ledger policy and
//! commit or roll back as a whole.

pub mod account_service;
pub mod clock;
pub mod engine;
pub mod policy;
pub mod transaction_service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::LedgerEngine;
pub use policy::LedgerPolicy;
pub use transaction_service::lock_order;
