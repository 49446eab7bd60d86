//! Customer ledger error types.

use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Customer id does not exist
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    /// Phone number already belongs to another customer
    #[error("Phone number already registered: {0}")]
    DuplicatePhone(String),

    /// Charge amounts must be non-negative and finite
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// Charge minutes must be non-negative and finite
    #[error("Invalid minutes: {0}")]
    InvalidMinutes(f64),

    /// Customer name must be non-empty
    #[error("Customer name must not be empty")]
    InvalidName,

    /// Phone number failed validation
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    /// Manual adjustments must be credits or debits, never sessions
    #[error("Manual adjustments must be a credit or a debit")]
    InvalidAdjustmentKind,
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
