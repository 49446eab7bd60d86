//! Table engine error types.

use super::models::{GameType, TableAction, TableStatus};
use thiserror::Error;

/// Table engine errors
#[derive(Debug, Clone, Error)]
pub enum TableError {
    /// Game type not recognized
    #[error("Unknown game type: {0}")]
    UnknownGameType(String),

    /// Table id not part of the configured set
    #[error("Invalid {game} table id: {table_id}")]
    UnknownTable { game: GameType, table_id: u32 },

    /// Action not legal for the table's current status
    #[error("Cannot {action} a table that is {status}")]
    InvalidTransition {
        action: TableAction,
        status: TableStatus,
    },

    /// Requested rate not in the configured rate list
    #[error("Rate {0} is not an allowed rate")]
    RateNotAllowed(f64),

    /// Rate changes are only legal while a table is idle
    #[error("Cannot change rate while table is {0}")]
    RateLocked(TableStatus),

    /// The engine task is gone; only happens during shutdown
    #[error("Table engine is not running")]
    EngineClosed,
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
