//! Table timer engine: live table state, the 1 Hz tick, and session
//! finalization.
//!
//! This module implements:
//! - `TableState`: the per-table state machine (idle/running/paused) with an
//!   integer-seconds accumulator flushed on every tick and transition
//! - `TableEngine`: a single actor task owning all table state, driven by an
//!   mpsc inbox and a 1-second interval
//! - `TableManager`: the facade that spawns the engine, routes commands, and
//!   persists finalized sessions through the `SessionStore` port
//!
//! ## Architecture
//!
//! Staff actions and the background tick both mutate table state, so both are
//! serialized through the engine task's inbox. The engine never touches
//! storage; finalized sessions are handed back to the manager, which writes
//! them durably (with one retry) after the in-memory transition is already
//! committed. Callers learn about a failed write through
//! `ActionResult::persisted`.

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod models;

pub use config::TablesConfig;
pub use errors::{TableError, TableResult};
pub use manager::{ActionResult, TableManager};
pub use messages::{ActionOutcome, EngineStatus, GameStatus, TableCommand};
pub use models::{
    FinishedSession, GameType, RECENT_SESSIONS_CAP, TableAction, TableStatus, TableView,
};
