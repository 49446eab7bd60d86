//! Table engine message types.

use super::errors::TableError;
use super::models::{FinishedSession, GameType, TableAction, TableView};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// Commands accepted by the table engine task
#[derive(Debug)]
pub enum TableCommand {
    /// Start/pause/end a table on behalf of a staff member
    Action {
        game: GameType,
        table_id: u32,
        action: TableAction,
        staff: String,
        reply: oneshot::Sender<Result<ActionOutcome, TableError>>,
    },

    /// Change an idle table's rate for its next session
    UpdateRate {
        game: GameType,
        table_id: u32,
        rate: f64,
        reply: oneshot::Sender<Result<String, TableError>>,
    },

    /// Reset a table's recent-sessions display window (view only)
    ClearRecent {
        game: GameType,
        table_id: u32,
        reply: oneshot::Sender<Result<(), TableError>>,
    },

    /// Snapshot every table of one game type
    GetTables {
        game: GameType,
        reply: oneshot::Sender<BTreeMap<u32, TableView>>,
    },

    /// Per-game running/idle counts
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },

    /// Warm the recent-sessions windows from durable storage at startup
    SeedRecent { sessions: Vec<FinishedSession> },

    /// Advance timers to `now`. The engine's own interval drives this in
    /// production; tests send it directly with synthetic timestamps.
    Tick { now: DateTime<Utc> },
}

/// Result of a successful table action
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Human-readable confirmation for the staff UI
    pub message: String,

    /// Present only when the action was an `end`: the finalized session
    pub session: Option<FinishedSession>,
}

/// Table counts for one game type
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GameStatus {
    pub total: usize,
    pub running: usize,
    pub paused: usize,
    pub idle: usize,
}

/// Engine-wide status summary
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EngineStatus {
    pub snooker: GameStatus,
    pub pool: GameStatus,
}
