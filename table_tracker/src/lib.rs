//! # Table Tracker
//!
//! Billable table tracking for a snooker and pool hall. Two components make
//! up the core:
//!
//! - [`tables`]: the table timer engine. One actor task owns the live state
//!   of every physical table, advances running timers on a 1-second tick,
//!   and finalizes sessions into immutable records.
//! - [`ledger`]: the customer ledger. Atomic charge postings against running
//!   balances, an append-only transaction trail, lazily-reset daily totals,
//!   and split billing with partial-success reporting.
//!
//! The two never touch each other's state: ending a table yields a finalized
//! session, and the caller decides which customer (if any) to post its amount
//! to.
//!
//! Both sit on the storage ports in [`db`] (`SessionStore` and
//! `CustomerStore`), backed by PostgreSQL in production and by an in-memory
//! double in tests.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use table_tracker::db::MemoryStore;
//! use table_tracker::tables::{GameType, TableAction, TableManager, TablesConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let tables = TableManager::new(TablesConfig::default(), store);
//!
//!     let result = tables
//!         .handle_table_action(GameType::Snooker, 1, TableAction::Start, "admin")
//!         .await?;
//!     println!("{}", result.message);
//!     Ok(())
//! }
//! ```

/// Storage ports, PostgreSQL backend, and the in-memory double.
pub mod db;

/// Customer balances and the transaction audit trail.
pub mod ledger;

/// Live table state, the 1 Hz tick, and session finalization.
pub mod tables;

pub use db::{Database, DatabaseConfig};
pub use ledger::LedgerManager;
pub use tables::{GameType, TableManager, TablesConfig};
