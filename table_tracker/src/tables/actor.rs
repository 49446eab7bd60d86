//! Table engine task: serialized state mutation plus the 1 Hz tick.

use super::{
    config::TablesConfig,
    errors::TableError,
    messages::{ActionOutcome, EngineStatus, GameStatus, TableCommand},
    models::{FinishedSession, GameType, TableAction, TableState, TableStatus},
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::{
    sync::mpsc,
    time::{Duration, interval},
};

/// Timer cadence. Every running table accrues elapsed time on this beat.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owns the live state of every table.
///
/// All mutation, staff actions and the background tick alike, funnels
/// through this task's inbox, so a table can never be written from two places
/// at once. The engine does no storage I/O; finalized sessions travel back to
/// the caller, which persists them outside this task.
pub struct TableEngine {
    tables: HashMap<GameType, BTreeMap<u32, TableState>>,
    config: TablesConfig,
    inbox: mpsc::Receiver<TableCommand>,
}

impl TableEngine {
    /// Build the engine and the sender half of its inbox.
    pub fn new(config: TablesConfig) -> (Self, mpsc::Sender<TableCommand>) {
        let (sender, inbox) = mpsc::channel(64);

        let mut tables = HashMap::new();
        for game in GameType::ALL {
            let set = config
                .rates_for(game)
                .iter()
                .map(|(&id, &rate)| (id, TableState::new(game, id, rate)))
                .collect::<BTreeMap<_, _>>();
            tables.insert(game, set);
        }

        let engine = Self {
            tables,
            config,
            inbox,
        };

        (engine, sender)
    }

    /// Run the engine event loop until every sender is dropped.
    pub async fn run(mut self) {
        log::info!(
            "table engine starting: {} snooker, {} pool",
            self.tables[&GameType::Snooker].len(),
            self.tables[&GameType::Pool].len()
        );

        let mut ticker = interval(TICK_PERIOD);

        loop {
            tokio::select! {
                command = self.inbox.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => break,
                    }
                }

                _ = ticker.tick() => {
                    self.tick_all(Utc::now());
                }
            }
        }

        log::info!("table engine stopped");
    }

    fn handle(&mut self, command: TableCommand) {
        match command {
            TableCommand::Action {
                game,
                table_id,
                action,
                staff,
                reply,
            } => {
                let result = self.handle_action(game, table_id, action, &staff, Utc::now());
                let _ = reply.send(result);
            }

            TableCommand::UpdateRate {
                game,
                table_id,
                rate,
                reply,
            } => {
                let result = self.handle_rate_update(game, table_id, rate);
                let _ = reply.send(result);
            }

            TableCommand::ClearRecent {
                game,
                table_id,
                reply,
            } => {
                let result = self
                    .table_mut(game, table_id)
                    .map(|table| table.clear_recent());
                let _ = reply.send(result);
            }

            TableCommand::GetTables { game, reply } => {
                let views = self.tables[&game]
                    .iter()
                    .map(|(&id, table)| (id, table.view()))
                    .collect();
                let _ = reply.send(views);
            }

            TableCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }

            TableCommand::SeedRecent { sessions } => {
                self.seed_recent(sessions);
            }

            TableCommand::Tick { now } => {
                self.tick_all(now);
            }
        }
    }

    /// Apply one staff action. Rejections leave the table untouched.
    fn handle_action(
        &mut self,
        game: GameType,
        table_id: u32,
        action: TableAction,
        staff: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, TableError> {
        let table = self.table_mut(game, table_id)?;

        match action {
            TableAction::Start => {
                let resuming = table.status() == TableStatus::Paused;
                table.start(now)?;
                let verb = if resuming { "resumed" } else { "started" };
                log::info!("{} table {} {} by {}", game, table_id, verb, staff);
                Ok(ActionOutcome {
                    message: format!("{} table {} {}", game.title(), table_id, verb),
                    session: None,
                })
            }

            TableAction::Pause => {
                table.pause(now)?;
                log::info!("{} table {} paused by {}", game, table_id, staff);
                Ok(ActionOutcome {
                    message: format!("{} table {} paused", game.title(), table_id),
                    session: None,
                })
            }

            TableAction::End => {
                let session = table.end(now, staff)?;
                log::info!(
                    "{} table {} ended by {}: {:.2} for {:.1} minutes",
                    game,
                    table_id,
                    staff,
                    session.amount,
                    session.duration_minutes
                );
                Ok(ActionOutcome {
                    message: format!(
                        "{} table {} ended: {:.2} for {:.1} minutes",
                        game.title(),
                        table_id,
                        session.amount,
                        session.duration_minutes
                    ),
                    session: Some(session),
                })
            }
        }
    }

    fn handle_rate_update(
        &mut self,
        game: GameType,
        table_id: u32,
        rate: f64,
    ) -> Result<String, TableError> {
        if !self.config.is_rate_allowed(rate) {
            return Err(TableError::RateNotAllowed(rate));
        }

        let table = self.table_mut(game, table_id)?;
        table.set_rate(rate)?;

        log::info!("{} table {} rate set to {}/min", game, table_id, rate);
        Ok(format!("Rate updated to {rate}/min"))
    }

    /// Advance every running table. Paused and idle tables are skipped
    /// inside `TableState::tick`.
    fn tick_all(&mut self, now: DateTime<Utc>) {
        for set in self.tables.values_mut() {
            for table in set.values_mut() {
                table.tick(now);
            }
        }
    }

    fn seed_recent(&mut self, sessions: Vec<FinishedSession>) {
        for session in sessions {
            match self.table_mut(session.game, session.table_id) {
                Ok(table) => table.push_recent(session),
                Err(_) => log::warn!(
                    "ignoring stored session for unconfigured {} table {}",
                    session.game,
                    session.table_id
                ),
            }
        }
    }

    fn status(&self) -> EngineStatus {
        let count = |game: GameType| {
            let set = &self.tables[&game];
            let running = set
                .values()
                .filter(|t| t.status() == TableStatus::Running)
                .count();
            let paused = set
                .values()
                .filter(|t| t.status() == TableStatus::Paused)
                .count();
            GameStatus {
                total: set.len(),
                running,
                paused,
                idle: set.len() - running - paused,
            }
        };

        EngineStatus {
            snooker: count(GameType::Snooker),
            pool: count(GameType::Pool),
        }
    }

    fn table_mut(&mut self, game: GameType, table_id: u32) -> Result<&mut TableState, TableError> {
        self.tables
            .get_mut(&game)
            .and_then(|set| set.get_mut(&table_id))
            .ok_or(TableError::UnknownTable { game, table_id })
    }

    #[cfg(test)]
    pub(crate) fn table(&self, game: GameType, table_id: u32) -> Option<&TableState> {
        self.tables.get(&game).and_then(|set| set.get(&table_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn engine() -> TableEngine {
        TableEngine::new(TablesConfig::default()).0
    }

    #[test]
    fn unknown_table_is_rejected() {
        let mut e = engine();
        let err = e
            .handle_action(GameType::Snooker, 42, TableAction::Start, "admin", at(0))
            .unwrap_err();
        assert!(matches!(err, TableError::UnknownTable { table_id: 42, .. }));
    }

    #[test]
    fn tick_advances_only_running_tables() {
        let mut e = engine();
        e.handle_action(GameType::Snooker, 1, TableAction::Start, "admin", at(0))
            .unwrap();
        e.handle_action(GameType::Pool, 1, TableAction::Start, "admin", at(0))
            .unwrap();
        e.handle_action(GameType::Pool, 1, TableAction::Pause, "admin", at(0))
            .unwrap();

        for s in 1..=60 {
            e.tick_all(at(s));
        }

        assert_eq!(e.table(GameType::Snooker, 1).unwrap().elapsed_seconds(), 60);
        assert_eq!(e.table(GameType::Pool, 1).unwrap().elapsed_seconds(), 0);
        assert_eq!(e.table(GameType::Snooker, 2).unwrap().elapsed_seconds(), 0);
    }

    #[test]
    fn end_reports_the_finalized_session() {
        let mut e = engine();
        e.handle_action(GameType::Snooker, 2, TableAction::Start, "staff1", at(0))
            .unwrap();
        for s in 1..=120 {
            e.tick_all(at(s));
        }
        let outcome = e
            .handle_action(GameType::Snooker, 2, TableAction::End, "staff1", at(120))
            .unwrap();

        let session = outcome.session.expect("end yields a session");
        // Table 2 runs at 4.5/min by default.
        assert_eq!(session.duration_minutes, 2.0);
        assert_eq!(session.amount, 9.0);
        assert!(outcome.message.contains("Snooker table 2 ended"));
    }

    #[test]
    fn rate_update_checks_list_membership_and_status() {
        let mut e = engine();

        assert!(matches!(
            e.handle_rate_update(GameType::Pool, 1, 3.33),
            Err(TableError::RateNotAllowed(_))
        ));

        e.handle_action(GameType::Pool, 1, TableAction::Start, "admin", at(0))
            .unwrap();
        assert!(matches!(
            e.handle_rate_update(GameType::Pool, 1, 3.0),
            Err(TableError::RateLocked(TableStatus::Running))
        ));

        e.handle_action(GameType::Pool, 1, TableAction::End, "admin", at(10))
            .unwrap();
        let message = e.handle_rate_update(GameType::Pool, 1, 3.0).unwrap();
        assert!(message.contains("3"));
        assert_eq!(e.table(GameType::Pool, 1).unwrap().rate(), 3.0);
    }

    #[test]
    fn status_counts_by_game_type() {
        let mut e = engine();
        e.handle_action(GameType::Snooker, 1, TableAction::Start, "admin", at(0))
            .unwrap();
        e.handle_action(GameType::Snooker, 2, TableAction::Start, "admin", at(0))
            .unwrap();
        e.handle_action(GameType::Snooker, 2, TableAction::Pause, "admin", at(5))
            .unwrap();

        let status = e.status();
        assert_eq!(status.snooker.total, 3);
        assert_eq!(status.snooker.running, 1);
        assert_eq!(status.snooker.paused, 1);
        assert_eq!(status.snooker.idle, 1);
        assert_eq!(status.pool.running, 0);
    }

    #[test]
    fn seeding_ignores_unconfigured_tables() {
        let mut e = engine();
        let session = FinishedSession {
            table_id: 99,
            game: GameType::Pool,
            start_time: "10:00:00".to_string(),
            end_time: "10:30:00".to_string(),
            duration_minutes: 30.0,
            amount: 60.0,
            rate: 2.0,
            staff: "admin".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        e.seed_recent(vec![session.clone()]);

        let mut valid = session;
        valid.table_id = 1;
        e.seed_recent(vec![valid]);
        assert_eq!(e.table(GameType::Pool, 1).unwrap().recent_sessions().len(), 1);
    }
}
