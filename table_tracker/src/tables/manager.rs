//! Table manager: the public face of the timer engine.
//!
//! Spawns the engine task, turns calls into inbox commands, and handles the
//! one concern the engine deliberately does not: persisting finalized
//! sessions. The durable write happens here, after the in-memory transition
//! has been acknowledged, so the tick loop never waits on storage.

use super::{
    config::TablesConfig,
    errors::TableError,
    messages::{EngineStatus, TableCommand},
    models::{FinishedSession, GameType, TableAction, TableView},
};
use crate::db::repository::SessionStore;
use crate::tables::actor::TableEngine;
use crate::tables::models::RECENT_SESSIONS_CAP;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Outcome of a staff action, including persistence status
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Confirmation message for the staff UI
    pub message: String,

    /// The finalized session, when the action was an `end`
    pub session: Option<FinishedSession>,

    /// False when the durable write failed after the retry. The in-memory
    /// state is still authoritative for display; operators reconcile later.
    pub persisted: bool,

    /// Whether the UI should follow up with a customer-assignment prompt
    pub prompt_assignment: bool,
}

/// Facade over the table engine task
#[derive(Clone)]
pub struct TableManager {
    sender: mpsc::Sender<TableCommand>,
    sessions: Arc<dyn SessionStore>,
    config: TablesConfig,
}

impl TableManager {
    /// Spawn the engine for the configured table set.
    pub fn new(config: TablesConfig, sessions: Arc<dyn SessionStore>) -> Self {
        let (engine, sender) = TableEngine::new(config.clone());
        tokio::spawn(engine.run());

        Self {
            sender,
            sessions,
            config,
        }
    }

    /// Warm each table's recent-sessions window from durable storage.
    ///
    /// Storage trouble here is logged and skipped; an empty window is a
    /// display inconvenience, not a startup failure.
    ///
    /// # Returns
    ///
    /// * `usize` - Number of sessions loaded
    pub async fn seed_recent_sessions(&self) -> usize {
        let mut seeded = Vec::new();

        for game in GameType::ALL {
            for &table_id in self.config.rates_for(game).keys() {
                match self
                    .sessions
                    .recent_sessions(game, table_id, RECENT_SESSIONS_CAP as i64)
                    .await
                {
                    Ok(mut sessions) => {
                        // Storage returns most-recent-first; the window wants
                        // most-recent-last.
                        sessions.reverse();
                        seeded.extend(sessions);
                    }
                    Err(e) => {
                        log::warn!(
                            "could not load recent sessions for {} table {}: {}",
                            game,
                            table_id,
                            e
                        );
                    }
                }
            }
        }

        let count = seeded.len();
        if count > 0 {
            let _ = self
                .sender
                .send(TableCommand::SeedRecent { sessions: seeded })
                .await;
            log::info!("seeded {} recent sessions from storage", count);
        }
        count
    }

    /// Handle a staff action on a table.
    ///
    /// On a successful `end`, the finalized session is written to durable
    /// storage with one immediate retry. A failed write is reported via
    /// `ActionResult::persisted`, never silently swallowed.
    ///
    /// # Arguments
    ///
    /// * `game` - Game type of the table
    /// * `table_id` - Table id within the game type's set
    /// * `action` - Start, pause, or end
    /// * `staff` - Acting staff member, recorded on the session
    pub async fn handle_table_action(
        &self,
        game: GameType,
        table_id: u32,
        action: TableAction,
        staff: &str,
    ) -> Result<ActionResult, TableError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(TableCommand::Action {
                game,
                table_id,
                action,
                staff: staff.to_string(),
                reply,
            })
            .await
            .map_err(|_| TableError::EngineClosed)?;

        let outcome = rx.await.map_err(|_| TableError::EngineClosed)??;

        match outcome.session {
            Some(session) => {
                let persisted = self.save_with_retry(&session).await;
                Ok(ActionResult {
                    message: outcome.message,
                    session: Some(session),
                    persisted,
                    prompt_assignment: true,
                })
            }
            None => Ok(ActionResult {
                message: outcome.message,
                session: None,
                persisted: true,
                prompt_assignment: false,
            }),
        }
    }

    /// Snapshot every table of one game type, keyed by table id.
    pub async fn get_tables(&self, game: GameType) -> Result<BTreeMap<u32, TableView>, TableError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(TableCommand::GetTables { game, reply })
            .await
            .map_err(|_| TableError::EngineClosed)?;
        rx.await.map_err(|_| TableError::EngineClosed)
    }

    /// Change an idle table's rate for its next session.
    pub async fn update_table_rate(
        &self,
        game: GameType,
        table_id: u32,
        rate: f64,
    ) -> Result<String, TableError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(TableCommand::UpdateRate {
                game,
                table_id,
                rate,
                reply,
            })
            .await
            .map_err(|_| TableError::EngineClosed)?;
        rx.await.map_err(|_| TableError::EngineClosed)?
    }

    /// Clear a table's recent-sessions display. Durable records are kept.
    pub async fn clear_recent_sessions(
        &self,
        game: GameType,
        table_id: u32,
    ) -> Result<(), TableError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(TableCommand::ClearRecent {
                game,
                table_id,
                reply,
            })
            .await
            .map_err(|_| TableError::EngineClosed)?;
        rx.await.map_err(|_| TableError::EngineClosed)?
    }

    /// Per-game running/paused/idle table counts.
    pub async fn status(&self) -> Result<EngineStatus, TableError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(TableCommand::Status { reply })
            .await
            .map_err(|_| TableError::EngineClosed)?;
        rx.await.map_err(|_| TableError::EngineClosed)
    }

    /// Rates staff may assign to an idle table.
    pub fn available_rates(&self) -> &[f64] {
        &self.config.available_rates
    }

    /// Send a synthetic tick. Exposed for deterministic tests.
    pub async fn tick_at(&self, now: chrono::DateTime<chrono::Utc>) -> Result<(), TableError> {
        self.sender
            .send(TableCommand::Tick { now })
            .await
            .map_err(|_| TableError::EngineClosed)
    }

    async fn save_with_retry(&self, session: &FinishedSession) -> bool {
        match self.sessions.save_session(session).await {
            Ok(()) => true,
            Err(first) => {
                log::warn!(
                    "failed to save session for {} table {}: {}; retrying once",
                    session.game,
                    session.table_id,
                    first
                );
                match self.sessions.save_session(session).await {
                    Ok(()) => true,
                    Err(second) => {
                        log::error!(
                            "session for {} table {} was NOT durably saved: {}",
                            session.game,
                            session.table_id,
                            second
                        );
                        false
                    }
                }
            }
        }
    }
}
