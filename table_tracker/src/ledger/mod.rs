//! Customer ledger: balances, audit trail, and split billing.
//!
//! This module implements:
//! - Customer records keyed by unique phone number, with cumulative,
//!   per-game, and rolling "today" balances
//! - Atomic charge postings and manual adjustments, each appending one
//!   append-only `Transaction`
//! - Lazy daily reset: today-figures are zeroed by the first write that
//!   touches a customer on a new calendar date, instead of a midnight job
//! - Split billing with explicit partial-success reporting
//!
//! The ledger holds no table state and never sees a timer; it receives
//! opaque charge amounts from callers.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{LedgerError, LedgerResult};
pub use manager::LedgerManager;
pub use models::{
    BalanceAdjustment, ChargePosting, Customer, SplitFailure, SplitOutcome, TodayStats,
    TopCustomer, Transaction, TransactionKind,
};
