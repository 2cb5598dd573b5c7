//! Per-owner bank balances with rate-limited deposits and withdrawals.
//!
//! Three layers, persistence-first:
//! - [`store::BankStore`] owns the SQLite-backed records and is the single
//!   atomic boundary for balance mutations.
//! - [`policy`] is the pure cooldown decision: one deposit and one
//!   withdrawal per rolling 24-hour window, independently tracked.
//! - [`service::BankService`] orchestrates affordability, policy, and the
//!   store, surfacing typed results to callers.

pub mod clock;
pub mod error;
pub mod policy;
pub mod service;
pub mod store;
pub mod types;

pub use error::{BankError, BankResult};
pub use policy::OpKind;
pub use service::BankService;
pub use store::BankStore;
pub use types::{BankRecord, OwnerKey};
