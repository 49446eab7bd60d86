//! Customer ledger data models.

use crate::tables::GameType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered customer with running balances.
///
/// Phone number is the natural key; balances only move through charge
/// postings and manual adjustments, each of which also appends a
/// `Transaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub total_amount: f64,
    pub total_minutes: f64,
    pub snooker_amount: f64,
    pub snooker_minutes: f64,
    pub pool_amount: f64,
    pub pool_minutes: f64,
    /// Rolling totals for the current calendar date; lazily zeroed on the
    /// first write after a date change
    pub today_amount: f64,
    pub today_minutes: f64,
    /// Snapshot of the most recent session applied
    pub last_session_amount: f64,
    pub last_session_minutes: f64,
    pub last_session_at: Option<DateTime<Utc>>,
    /// Date of the last balance-moving write; drives the lazy daily reset
    pub last_updated_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Charge from a finished table session
    Session,
    /// Manual addition
    Credit,
    /// Manual subtraction
    Debit,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Session => write!(f, "session"),
            TransactionKind::Credit => write!(f, "credit"),
            TransactionKind::Debit => write!(f, "debit"),
        }
    }
}

impl TransactionKind {
    /// Parse a stored kind string, defaulting unknowns to `Session`.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "credit" => TransactionKind::Credit,
            "debit" => TransactionKind::Debit,
            _ => TransactionKind::Session,
        }
    }
}

/// Append-only audit record. Never edited in place; deleted only when its
/// customer is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub customer_id: i64,
    /// Signed amount; negative for manual subtractions
    pub amount: f64,
    pub kind: TransactionKind,
    pub game: Option<GameType>,
    pub description: Option<String>,
    pub staff: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One session charge to apply to a customer, atomically
#[derive(Debug, Clone)]
pub struct ChargePosting {
    pub customer_id: i64,
    pub amount: f64,
    pub minutes: f64,
    pub game: GameType,
    pub description: String,
    pub staff: String,
    /// Posting date; drives the lazy daily reset
    pub date: NaiveDate,
}

/// One manual balance adjustment to apply to a customer, atomically
#[derive(Debug, Clone)]
pub struct BalanceAdjustment {
    pub customer_id: i64,
    /// Signed amount
    pub amount: f64,
    pub kind: TransactionKind,
    pub description: String,
    pub staff: String,
    pub date: NaiveDate,
}

/// Venue-wide figures for the current date
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    pub total_customers: i64,
    pub today_amount: f64,
    pub today_minutes: f64,
    pub snooker_amount: f64,
    pub pool_amount: f64,
}

/// Leaderboard entry for the highest-spending customers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCustomer {
    pub name: String,
    pub total_amount: f64,
}

/// Per-player result of a split-billing run.
///
/// Split billing deliberately applies each player's charge independently:
/// a failure partway through leaves earlier players charged. This report is
/// how that partial outcome reaches the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitOutcome {
    /// Customer ids whose charge was applied
    pub applied: Vec<i64>,
    /// Players whose charge failed, with the reason
    pub failed: Vec<SplitFailure>,
}

/// A single failed entry in a split-billing run
#[derive(Debug, Clone, Serialize)]
pub struct SplitFailure {
    pub customer_id: i64,
    pub reason: String,
}

impl SplitOutcome {
    pub fn all_applied(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.applied.is_empty() && !self.failed.is_empty()
    }
}
