//! Table state machine and session models.

use super::errors::TableError;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of finalized sessions kept in a table's display window.
pub const RECENT_SESSIONS_CAP: usize = 3;

/// Game type a table is dedicated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Snooker,
    Pool,
}

impl GameType {
    /// All game types, in display order
    pub const ALL: [GameType; 2] = [GameType::Snooker, GameType::Pool];

    /// Capitalized name for user-facing messages
    pub fn title(&self) -> &'static str {
        match self {
            GameType::Snooker => "Snooker",
            GameType::Pool => "Pool",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Snooker => write!(f, "snooker"),
            GameType::Pool => write!(f, "pool"),
        }
    }
}

impl std::str::FromStr for GameType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snooker" => Ok(GameType::Snooker),
            "pool" => Ok(GameType::Pool),
            other => Err(TableError::UnknownGameType(other.to_string())),
        }
    }
}

/// Table lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableStatus::Idle => write!(f, "idle"),
            TableStatus::Running => write!(f, "running"),
            TableStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Actions a staff member can request on a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    Start,
    Pause,
    End,
}

impl std::fmt::Display for TableAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableAction::Start => write!(f, "start"),
            TableAction::Pause => write!(f, "pause"),
            TableAction::End => write!(f, "end"),
        }
    }
}

/// A finalized billable session. Immutable once created by ending a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedSession {
    pub table_id: u32,
    pub game: GameType,
    /// Wall-clock time of day the session started, "HH:MM:SS"
    pub start_time: String,
    /// Wall-clock time of day the session ended, "HH:MM:SS"
    pub end_time: String,
    /// Duration in minutes, one decimal
    pub duration_minutes: f64,
    /// Charge in currency, two decimals
    pub amount: f64,
    /// Rate per minute that was applied
    pub rate: f64,
    pub staff: String,
    pub date: NaiveDate,
}

/// Read-only snapshot of one table for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableView {
    pub status: TableStatus,
    /// Elapsed session time as "MM:SS"
    pub time: String,
    pub rate: f64,
    pub amount: f64,
    pub recent_sessions: Vec<FinishedSession>,
}

/// Live state of a single physical table.
///
/// Elapsed time is flushed into an integer-seconds accumulator on every tick
/// and every transition instead of being recomputed from the original start
/// timestamp. This keeps pause/resume cycles exact and stops clock skew from
/// compounding over a long session.
#[derive(Debug, Clone)]
pub struct TableState {
    game: GameType,
    table_id: u32,
    status: TableStatus,
    rate: f64,
    elapsed_seconds: i64,
    amount: f64,
    session_start_clock: Option<String>,
    last_update: Option<DateTime<Utc>>,
    recent_sessions: Vec<FinishedSession>,
}

impl TableState {
    pub fn new(game: GameType, table_id: u32, rate: f64) -> Self {
        Self {
            game,
            table_id,
            status: TableStatus::Idle,
            rate,
            elapsed_seconds: 0,
            amount: 0.0,
            session_start_clock: None,
            last_update: None,
            recent_sessions: Vec::new(),
        }
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.elapsed_seconds
    }

    pub fn recent_sessions(&self) -> &[FinishedSession] {
        &self.recent_sessions
    }

    /// Start a new session on an idle table, or resume a paused one.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TableError> {
        match self.status {
            TableStatus::Idle => {
                self.status = TableStatus::Running;
                self.elapsed_seconds = 0;
                self.amount = 0.0;
                self.last_update = Some(now);
                self.session_start_clock = Some(clock_string(now));
                Ok(())
            }
            TableStatus::Paused => {
                // Elapsed time was already flushed when pausing; just restart
                // the accumulation watermark.
                self.status = TableStatus::Running;
                self.last_update = Some(now);
                Ok(())
            }
            TableStatus::Running => Err(TableError::InvalidTransition {
                action: TableAction::Start,
                status: self.status,
            }),
        }
    }

    /// Pause a running session, flushing elapsed time up to `now`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TableError> {
        if self.status != TableStatus::Running {
            return Err(TableError::InvalidTransition {
                action: TableAction::Pause,
                status: self.status,
            });
        }
        self.flush_elapsed(now);
        self.status = TableStatus::Paused;
        Ok(())
    }

    /// End the current session, returning the finalized record.
    ///
    /// The table is reset to idle and the record is appended to the
    /// recent-sessions window, dropping the oldest past the cap.
    pub fn end(&mut self, now: DateTime<Utc>, staff: &str) -> Result<FinishedSession, TableError> {
        match self.status {
            TableStatus::Running => self.flush_elapsed(now),
            // A paused table already has its elapsed time flushed.
            TableStatus::Paused => {}
            TableStatus::Idle => {
                return Err(TableError::InvalidTransition {
                    action: TableAction::End,
                    status: self.status,
                });
            }
        }

        let duration_minutes = self.elapsed_seconds as f64 / 60.0;
        let session = FinishedSession {
            table_id: self.table_id,
            game: self.game,
            start_time: self
                .session_start_clock
                .take()
                .unwrap_or_else(|| "00:00:00".to_string()),
            end_time: clock_string(now),
            duration_minutes: round1(duration_minutes),
            amount: round2(duration_minutes * self.rate),
            rate: self.rate,
            staff: staff.to_string(),
            date: local_date(now),
        };

        self.push_recent(session.clone());

        self.status = TableStatus::Idle;
        self.elapsed_seconds = 0;
        self.amount = 0.0;
        self.last_update = None;

        Ok(session)
    }

    /// Advance the timer for a running table. Paused and idle tables are
    /// untouched.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.status == TableStatus::Running {
            self.flush_elapsed(now);
        }
    }

    /// Change the rate for the next session. Legal only while idle; list
    /// membership is checked by the engine, which owns the configured rates.
    pub fn set_rate(&mut self, rate: f64) -> Result<(), TableError> {
        if self.status != TableStatus::Idle {
            return Err(TableError::RateLocked(self.status));
        }
        self.rate = rate;
        Ok(())
    }

    /// Reset the recent-sessions display window. Durable records are kept.
    pub fn clear_recent(&mut self) {
        self.recent_sessions.clear();
    }

    /// Append a finalized session, most recent last, dropping the oldest
    /// beyond the cap.
    pub fn push_recent(&mut self, session: FinishedSession) {
        self.recent_sessions.push(session);
        if self.recent_sessions.len() > RECENT_SESSIONS_CAP {
            let overflow = self.recent_sessions.len() - RECENT_SESSIONS_CAP;
            self.recent_sessions.drain(..overflow);
        }
    }

    pub fn view(&self) -> TableView {
        TableView {
            status: self.status,
            time: format!(
                "{:02}:{:02}",
                self.elapsed_seconds / 60,
                self.elapsed_seconds % 60
            ),
            rate: self.rate,
            amount: self.amount,
            recent_sessions: self.recent_sessions.clone(),
        }
    }

    /// Move whole seconds from the wall clock into the accumulator and
    /// recompute the displayed amount. The watermark only advances by the
    /// seconds consumed, so sub-second remainders carry into the next flush
    /// instead of being truncated away on every tick.
    fn flush_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(watermark) = self.last_update {
            let whole = (now - watermark).num_seconds().max(0);
            self.elapsed_seconds += whole;
            self.last_update = Some(watermark + chrono::Duration::seconds(whole));
            self.amount = round2(self.elapsed_seconds as f64 / 60.0 * self.rate);
        }
    }
}

fn clock_string(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn local_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn table() -> TableState {
        TableState::new(GameType::Snooker, 1, 4.0)
    }

    #[test]
    fn start_then_immediate_end_charges_nothing() {
        let mut t = table();
        t.start(at(0)).unwrap();
        let session = t.end(at(0), "admin").unwrap();

        assert_eq!(session.duration_minutes, 0.0);
        assert_eq!(session.amount, 0.0);
        assert_eq!(t.status(), TableStatus::Idle);
        assert_eq!(t.elapsed_seconds(), 0);
    }

    #[test]
    fn ticks_accumulate_whole_seconds_and_amount() {
        let mut t = table();
        t.start(at(0)).unwrap();
        for s in 1..=90 {
            t.tick(at(s));
        }
        assert_eq!(t.elapsed_seconds(), 90);
        // 1.5 minutes at 4.0/min
        assert_eq!(t.view().amount, 6.0);
        assert_eq!(t.view().time, "01:30");
    }

    #[test]
    fn sub_second_remainders_are_not_lost() {
        let mut t = table();
        t.start(at(0)).unwrap();
        // Ticks arriving slightly early: 900ms cadence. Whole-second flushing
        // must still account for all elapsed time by the end.
        for i in 1..=100 {
            let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap()
                + chrono::Duration::milliseconds(900 * i);
            t.tick(now);
        }
        // 90 full seconds have passed by the last tick.
        assert_eq!(t.elapsed_seconds(), 90);
    }

    #[test]
    fn pause_freezes_elapsed_time() {
        let mut t = table();
        t.start(at(0)).unwrap();
        t.tick(at(30));
        t.pause(at(45)).unwrap();
        assert_eq!(t.elapsed_seconds(), 45);

        // Ticks while paused change nothing.
        t.tick(at(300));
        assert_eq!(t.elapsed_seconds(), 45);
        assert_eq!(t.status(), TableStatus::Paused);

        // Resume and run another 15 seconds; the pause gap never counts.
        t.start(at(600)).unwrap();
        t.tick(at(615));
        assert_eq!(t.elapsed_seconds(), 60);
    }

    #[test]
    fn end_from_paused_uses_flushed_time() {
        let mut t = table();
        t.start(at(0)).unwrap();
        t.pause(at(60)).unwrap();
        let session = t.end(at(500), "admin").unwrap();
        assert_eq!(session.duration_minutes, 1.0);
        assert_eq!(session.amount, 4.0);
    }

    #[test]
    fn illegal_transitions_are_rejected_without_mutation() {
        let mut t = table();

        assert!(matches!(
            t.end(at(0), "admin"),
            Err(TableError::InvalidTransition { .. })
        ));
        assert!(matches!(
            t.pause(at(0)),
            Err(TableError::InvalidTransition { .. })
        ));

        t.start(at(0)).unwrap();
        assert!(matches!(
            t.start(at(1)),
            Err(TableError::InvalidTransition { .. })
        ));
        assert_eq!(t.status(), TableStatus::Running);

        t.pause(at(10)).unwrap();
        assert!(matches!(
            t.pause(at(11)),
            Err(TableError::InvalidTransition { .. })
        ));
        assert_eq!(t.elapsed_seconds(), 10);
    }

    #[test]
    fn rate_change_is_idle_only() {
        let mut t = table();
        t.start(at(0)).unwrap();
        assert!(matches!(t.set_rate(5.0), Err(TableError::RateLocked(_))));
        assert_eq!(t.rate(), 4.0);

        t.end(at(60), "admin").unwrap();
        t.set_rate(5.0).unwrap();
        assert_eq!(t.rate(), 5.0);
    }

    #[test]
    fn recent_window_caps_at_three_dropping_oldest() {
        let mut t = table();
        for i in 0..5 {
            let base = i * 1000;
            t.start(at(base)).unwrap();
            t.end(at(base + 60 * (i + 1)), "admin").unwrap();
        }
        let recent = t.recent_sessions();
        assert_eq!(recent.len(), RECENT_SESSIONS_CAP);
        // Most recent last; the two oldest sessions fell out.
        assert_eq!(recent[0].duration_minutes, 3.0);
        assert_eq!(recent[2].duration_minutes, 5.0);

        t.clear_recent();
        assert!(t.recent_sessions().is_empty());
    }

    #[test]
    fn snooker_session_scenario() {
        // Table at 4.0/min: start, 150 seconds of ticks, end.
        let mut t = table();
        t.start(at(0)).unwrap();
        for s in 1..=150 {
            t.tick(at(s));
        }
        let session = t.end(at(150), "staff1").unwrap();

        assert_eq!(session.duration_minutes, 2.5);
        assert_eq!(session.amount, 10.0);
        assert_eq!(session.rate, 4.0);
        assert_eq!(session.game, GameType::Snooker);
        assert_eq!(session.staff, "staff1");
        assert_eq!(t.status(), TableStatus::Idle);
        assert_eq!(t.elapsed_seconds(), 0);
        assert_eq!(t.recent_sessions().len(), 1);
    }

    #[test]
    fn duration_rounds_to_one_decimal_amount_to_two() {
        let mut t = TableState::new(GameType::Pool, 2, 2.5);
        t.start(at(0)).unwrap();
        for s in 1..=100 {
            t.tick(at(s));
        }
        let session = t.end(at(100), "admin").unwrap();
        // 100s = 1.666..min -> 1.7; amount from the unrounded duration:
        // 1.666.. * 2.5 = 4.1666.. -> 4.17
        assert_eq!(session.duration_minutes, 1.7);
        assert_eq!(session.amount, 4.17);
    }

    #[test]
    fn game_type_parses_from_path_segment() {
        assert_eq!("snooker".parse::<GameType>().unwrap(), GameType::Snooker);
        assert_eq!("pool".parse::<GameType>().unwrap(), GameType::Pool);
        assert!(matches!(
            "darts".parse::<GameType>(),
            Err(TableError::UnknownGameType(_))
        ));
    }
}
