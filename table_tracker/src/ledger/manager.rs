//! Ledger manager: validation and orchestration over the customer store.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{
        BalanceAdjustment, ChargePosting, Customer, SplitFailure, SplitOutcome, TodayStats,
        TopCustomer, Transaction, TransactionKind,
    },
};
use crate::db::repository::CustomerStore;
use crate::tables::GameType;
use chrono::{Local, NaiveDate};
use std::sync::Arc;

/// Ledger manager
///
/// Owns no balances itself; every balance-moving operation is a single
/// atomic call into the `CustomerStore` port, so two concurrent postings to
/// the same customer can never drop an increment.
#[derive(Clone)]
pub struct LedgerManager {
    store: Arc<dyn CustomerStore>,
}

impl LedgerManager {
    /// Create a new ledger manager over a customer store.
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidName` / `InvalidPhone` - rejected input
    /// * `LedgerError::DuplicatePhone` - phone number already registered
    pub async fn register_customer(&self, name: &str, phone: &str) -> LedgerResult<i64> {
        let (name, phone) = validate_contact(name, phone)?;
        let id = self.store.insert_customer(&name, &phone, today()).await?;
        log::info!("registered customer {} ({})", name, id);
        Ok(id)
    }

    /// Apply a session charge to a customer.
    ///
    /// The store applies all six effects atomically: cumulative totals,
    /// game-type sub-totals, today's rolling totals (reset first if the date
    /// changed), the last-session snapshot, and the audit transaction.
    pub async fn post_charge(
        &self,
        customer_id: i64,
        amount: f64,
        minutes: f64,
        description: &str,
        staff: &str,
        game: GameType,
    ) -> LedgerResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(LedgerError::InvalidMinutes(minutes));
        }

        self.store
            .post_charge(&ChargePosting {
                customer_id,
                amount,
                minutes,
                game,
                description: description.to_string(),
                staff: staff.to_string(),
                date: today(),
            })
            .await?;

        log::info!(
            "posted {:.2} / {:.1} min ({}) to customer {}",
            amount,
            minutes,
            game,
            customer_id
        );
        Ok(())
    }

    /// Apply a manual balance adjustment.
    ///
    /// Whether a given actor may submit a negative amount is the caller's
    /// policy, not the ledger's.
    pub async fn adjust_balance(
        &self,
        customer_id: i64,
        amount: f64,
        kind: TransactionKind,
        staff: &str,
    ) -> LedgerResult<()> {
        if !amount.is_finite() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if kind == TransactionKind::Session {
            return Err(LedgerError::InvalidAdjustmentKind);
        }

        let description = format!(
            "Manual {} by {}",
            if amount >= 0.0 { "addition" } else { "subtraction" },
            staff
        );

        self.store
            .adjust_balance(&BalanceAdjustment {
                customer_id,
                amount,
                kind,
                description,
                staff: staff.to_string(),
                date: today(),
            })
            .await?;

        log::info!(
            "adjusted customer {} balance by {:.2} ({})",
            customer_id,
            amount,
            kind
        );
        Ok(())
    }

    /// Split a session's bill across several players.
    ///
    /// Each player is charged independently; there is no rollback when a
    /// later player fails. The outcome lists who was charged and who was not.
    pub async fn split_charge(
        &self,
        customer_ids: &[i64],
        per_player_amount: f64,
        per_player_minutes: f64,
        game: GameType,
        table_id: u32,
        staff: &str,
    ) -> LedgerResult<SplitOutcome> {
        if !per_player_amount.is_finite() || per_player_amount < 0.0 {
            return Err(LedgerError::InvalidAmount(per_player_amount));
        }
        if !per_player_minutes.is_finite() || per_player_minutes < 0.0 {
            return Err(LedgerError::InvalidMinutes(per_player_minutes));
        }

        let description = format!(
            "Split {} table {} session ({} players)",
            game.title(),
            table_id,
            customer_ids.len()
        );

        let mut outcome = SplitOutcome::default();
        for &customer_id in customer_ids {
            let result = self
                .store
                .post_charge(&ChargePosting {
                    customer_id,
                    amount: per_player_amount,
                    minutes: per_player_minutes,
                    game,
                    description: description.clone(),
                    staff: staff.to_string(),
                    date: today(),
                })
                .await;

            match result {
                Ok(()) => outcome.applied.push(customer_id),
                Err(e) => {
                    log::warn!("split charge failed for customer {}: {}", customer_id, e);
                    outcome.failed.push(SplitFailure {
                        customer_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "split bill on {} table {}: {} charged, {} failed",
            game,
            table_id,
            outcome.applied.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    /// Look up one customer.
    pub async fn get_customer(&self, customer_id: i64) -> LedgerResult<Customer> {
        self.store
            .fetch_customer(customer_id)
            .await?
            .ok_or(LedgerError::CustomerNotFound(customer_id))
    }

    /// Search customers by name or phone fragment. Terms shorter than two
    /// characters match nothing.
    pub async fn search_customers(&self, term: &str) -> LedgerResult<Vec<Customer>> {
        let term = term.trim();
        if term.len() < 2 {
            return Ok(Vec::new());
        }
        self.store.search(term).await
    }

    /// All customers, highest spender first.
    pub async fn get_all_customers(&self) -> LedgerResult<Vec<Customer>> {
        self.store.all_customers().await
    }

    /// Venue-wide figures for the current date.
    pub async fn get_today_stats(&self) -> LedgerResult<TodayStats> {
        self.store.today_stats(today()).await
    }

    /// The `limit` highest-spending customers.
    pub async fn get_top_customers(&self, limit: i64) -> LedgerResult<Vec<TopCustomer>> {
        self.store.top_customers(limit.max(0)).await
    }

    /// A customer's most recent transactions.
    pub async fn get_transactions(
        &self,
        customer_id: i64,
        limit: i64,
    ) -> LedgerResult<Vec<Transaction>> {
        self.store.transactions_for(customer_id, limit.max(0)).await
    }

    /// Update a customer's name and phone, keeping the uniqueness constraint.
    pub async fn update_contact(
        &self,
        customer_id: i64,
        name: &str,
        phone: &str,
    ) -> LedgerResult<()> {
        let (name, phone) = validate_contact(name, phone)?;
        self.store.update_contact(customer_id, &name, &phone).await
    }

    /// Delete a customer. Their transactions go with them; finalized session
    /// records are untouched.
    pub async fn delete_customer(&self, customer_id: i64) -> LedgerResult<()> {
        self.store.delete_customer(customer_id).await?;
        log::info!("deleted customer {}", customer_id);
        Ok(())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Trim and validate registration input.
fn validate_contact(name: &str, phone: &str) -> LedgerResult<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::InvalidName);
    }

    let phone = phone.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let plausible = !phone.is_empty()
        && digits >= 7
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
    if !plausible {
        return Err(LedgerError::InvalidPhone(phone.to_string()));
    }

    Ok((name.to_string(), phone.to_string()))
}
