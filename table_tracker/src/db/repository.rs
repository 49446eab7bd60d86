//! Storage ports for sessions and customers.
//!
//! The engine and the ledger depend on these traits rather than on sqlx
//! directly. Port operations are transaction-sized, so every implementation
//! owns its own atomicity: PostgreSQL uses a sqlx transaction per posting,
//! the in-memory double a single mutex. `MemoryStore` backs the
//! deterministic tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use thiserror::Error;

use crate::ledger::{
    BalanceAdjustment, ChargePosting, Customer, LedgerError, LedgerResult, TodayStats, TopCustomer,
    Transaction, TransactionKind,
};
use crate::tables::{FinishedSession, GameType};

/// Session storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend refused the write (used by the test double's failure switch)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for session storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable storage for finalized sessions. Append-only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist one finalized session
    async fn save_session(&self, session: &FinishedSession) -> StorageResult<()>;

    /// The most recent finalized sessions for a table, newest first
    async fn recent_sessions(
        &self,
        game: GameType,
        table_id: u32,
        limit: i64,
    ) -> StorageResult<Vec<FinishedSession>>;
}

/// Durable storage for customers and their audit trail.
///
/// `post_charge` and `adjust_balance` are atomic as units: the balance
/// updates, the lazy daily reset, the last-session snapshot, and the audit
/// transaction either all land or none do.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Create a customer; fails on a duplicate phone number
    async fn insert_customer(&self, name: &str, phone: &str, date: NaiveDate) -> LedgerResult<i64>;

    /// Fetch one customer
    async fn fetch_customer(&self, customer_id: i64) -> LedgerResult<Option<Customer>>;

    /// Customers whose name or phone contains the term, by name
    async fn search(&self, term: &str) -> LedgerResult<Vec<Customer>>;

    /// All customers, highest spender first
    async fn all_customers(&self) -> LedgerResult<Vec<Customer>>;

    /// Apply a session charge atomically
    async fn post_charge(&self, posting: &ChargePosting) -> LedgerResult<()>;

    /// Apply a manual adjustment atomically
    async fn adjust_balance(&self, adjustment: &BalanceAdjustment) -> LedgerResult<()>;

    /// Venue-wide figures for one date
    async fn today_stats(&self, date: NaiveDate) -> LedgerResult<TodayStats>;

    /// The highest-spending customers
    async fn top_customers(&self, limit: i64) -> LedgerResult<Vec<TopCustomer>>;

    /// A customer's most recent transactions, newest first
    async fn transactions_for(&self, customer_id: i64, limit: i64)
    -> LedgerResult<Vec<Transaction>>;

    /// Update name/phone; the phone uniqueness constraint still applies
    async fn update_contact(&self, customer_id: i64, name: &str, phone: &str) -> LedgerResult<()>;

    /// Delete a customer, cascading their transactions
    async fn delete_customer(&self, customer_id: i64) -> LedgerResult<()>;
}

// ---------------------------------------------------------------------------
// PostgreSQL implementations
// ---------------------------------------------------------------------------

/// PostgreSQL-backed `SessionStore`
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save_session(&self, session: &FinishedSession) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (table_id, game_type, start_time, end_time, duration_minutes, amount, rate, staff, session_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.table_id as i32)
        .bind(session.game.to_string())
        .bind(&session.start_time)
        .bind(&session.end_time)
        .bind(session.duration_minutes)
        .bind(session.amount)
        .bind(session.rate)
        .bind(&session.staff)
        .bind(session.date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_sessions(
        &self,
        game: GameType,
        table_id: u32,
        limit: i64,
    ) -> StorageResult<Vec<FinishedSession>> {
        let rows = sqlx::query(
            r#"
            SELECT table_id, game_type, start_time, end_time, duration_minutes, amount, rate, staff, session_date
            FROM sessions
            WHERE game_type = $1 AND table_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(game.to_string())
        .bind(table_id as i32)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(session_from_row).collect())
    }
}

/// PostgreSQL-backed `CustomerStore`
#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn insert_customer(&self, name: &str, phone: &str, date: NaiveDate) -> LedgerResult<i64> {
        let result = sqlx::query(
            "INSERT INTO customers (name, phone, last_updated_date) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(phone)
        .bind(date)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.get("id")),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(LedgerError::DuplicatePhone(phone.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_customer(&self, customer_id: i64) -> LedgerResult<Option<Customer>> {
        let row = sqlx::query("SELECT * FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(customer_from_row))
    }

    async fn search(&self, term: &str) -> LedgerResult<Vec<Customer>> {
        let pattern = format!("%{term}%");
        let rows = sqlx::query(
            "SELECT * FROM customers WHERE name ILIKE $1 OR phone LIKE $1 ORDER BY name",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(customer_from_row).collect())
    }

    async fn all_customers(&self) -> LedgerResult<Vec<Customer>> {
        let rows = sqlx::query("SELECT * FROM customers ORDER BY total_amount DESC, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(customer_from_row).collect())
    }

    async fn post_charge(&self, posting: &ChargePosting) -> LedgerResult<()> {
        // Which sub-total columns move depends on the game type.
        let update = match posting.game {
            GameType::Snooker => {
                r#"
                UPDATE customers SET
                    total_amount = total_amount + $1,
                    total_minutes = total_minutes + $2,
                    snooker_amount = snooker_amount + $1,
                    snooker_minutes = snooker_minutes + $2,
                    today_amount = CASE WHEN last_updated_date IS NOT DISTINCT FROM $3 THEN today_amount ELSE 0 END + $1,
                    today_minutes = CASE WHEN last_updated_date IS NOT DISTINCT FROM $3 THEN today_minutes ELSE 0 END + $2,
                    last_session_amount = $1,
                    last_session_minutes = $2,
                    last_session_at = now(),
                    last_updated_date = $3
                WHERE id = $4
                "#
            }
            GameType::Pool => {
                r#"
                UPDATE customers SET
                    total_amount = total_amount + $1,
                    total_minutes = total_minutes + $2,
                    pool_amount = pool_amount + $1,
                    pool_minutes = pool_minutes + $2,
                    today_amount = CASE WHEN last_updated_date IS NOT DISTINCT FROM $3 THEN today_amount ELSE 0 END + $1,
                    today_minutes = CASE WHEN last_updated_date IS NOT DISTINCT FROM $3 THEN today_minutes ELSE 0 END + $2,
                    last_session_amount = $1,
                    last_session_minutes = $2,
                    last_session_at = now(),
                    last_updated_date = $3
                WHERE id = $4
                "#
            }
        };

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(update)
            .bind(posting.amount)
            .bind(posting.minutes)
            .bind(posting.date)
            .bind(posting.customer_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(LedgerError::CustomerNotFound(posting.customer_id));
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (customer_id, amount, kind, game_type, description, staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(posting.customer_id)
        .bind(posting.amount)
        .bind(TransactionKind::Session.to_string())
        .bind(posting.game.to_string())
        .bind(&posting.description)
        .bind(&posting.staff)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn adjust_balance(&self, adjustment: &BalanceAdjustment) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE customers SET
                total_amount = total_amount + $1,
                today_amount = CASE WHEN last_updated_date IS NOT DISTINCT FROM $2 THEN today_amount ELSE 0 END + $1,
                today_minutes = CASE WHEN last_updated_date IS NOT DISTINCT FROM $2 THEN today_minutes ELSE 0 END,
                last_updated_date = $2
            WHERE id = $3
            "#,
        )
        .bind(adjustment.amount)
        .bind(adjustment.date)
        .bind(adjustment.customer_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(LedgerError::CustomerNotFound(adjustment.customer_id));
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (customer_id, amount, kind, game_type, description, staff)
            VALUES ($1, $2, $3, NULL, $4, $5)
            "#,
        )
        .bind(adjustment.customer_id)
        .bind(adjustment.amount)
        .bind(adjustment.kind.to_string())
        .bind(&adjustment.description)
        .bind(&adjustment.staff)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn today_stats(&self, date: NaiveDate) -> LedgerResult<TodayStats> {
        let total_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        let today = sqlx::query(
            r#"
            SELECT COALESCE(SUM(today_amount), 0) AS amount, COALESCE(SUM(today_minutes), 0) AS minutes
            FROM customers
            WHERE last_updated_date = $1
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let per_game = |game: GameType| {
            sqlx::query_scalar::<_, f64>(
                r#"
                SELECT COALESCE(SUM(amount), 0)
                FROM transactions
                WHERE created_at::date = $1 AND game_type = $2
                "#,
            )
            .bind(date)
            .bind(game.to_string())
            .fetch_one(&self.pool)
        };

        Ok(TodayStats {
            total_customers,
            today_amount: today.get("amount"),
            today_minutes: today.get("minutes"),
            snooker_amount: per_game(GameType::Snooker).await?,
            pool_amount: per_game(GameType::Pool).await?,
        })
    }

    async fn top_customers(&self, limit: i64) -> LedgerResult<Vec<TopCustomer>> {
        let rows = sqlx::query(
            "SELECT name, total_amount FROM customers ORDER BY total_amount DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopCustomer {
                name: row.get("name"),
                total_amount: row.get("total_amount"),
            })
            .collect())
    }

    async fn transactions_for(
        &self,
        customer_id: i64,
        limit: i64,
    ) -> LedgerResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, amount, kind, game_type, description, staff, created_at
            FROM transactions
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(transaction_from_row).collect())
    }

    async fn update_contact(&self, customer_id: i64, name: &str, phone: &str) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE customers SET name = $1, phone = $2 WHERE id = $3")
            .bind(name)
            .bind(phone)
            .bind(customer_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(LedgerError::CustomerNotFound(customer_id))
            }
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(LedgerError::DuplicatePhone(phone.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_customer(&self, customer_id: i64) -> LedgerResult<()> {
        // Transactions go with the customer via ON DELETE CASCADE.
        let done = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }
        Ok(())
    }
}

fn customer_from_row(row: &PgRow) -> Customer {
    Customer {
        id: row.get("id"),
        name: row.get("name"),
        phone: row.get("phone"),
        total_amount: row.get("total_amount"),
        total_minutes: row.get("total_minutes"),
        snooker_amount: row.get("snooker_amount"),
        snooker_minutes: row.get("snooker_minutes"),
        pool_amount: row.get("pool_amount"),
        pool_minutes: row.get("pool_minutes"),
        today_amount: row.get("today_amount"),
        today_minutes: row.get("today_minutes"),
        last_session_amount: row.get("last_session_amount"),
        last_session_minutes: row.get("last_session_minutes"),
        last_session_at: row.get::<Option<DateTime<Utc>>, _>("last_session_at"),
        last_updated_date: row.get::<Option<NaiveDate>, _>("last_updated_date"),
        created_at: row.get("created_at"),
    }
}

fn transaction_from_row(row: &PgRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        amount: row.get("amount"),
        kind: TransactionKind::from_stored(row.get::<String, _>("kind").as_str()),
        game: row
            .get::<Option<String>, _>("game_type")
            .and_then(|s| s.parse().ok()),
        description: row.get("description"),
        staff: row.get("staff"),
        created_at: row.get("created_at"),
    }
}

fn session_from_row(row: &PgRow) -> FinishedSession {
    FinishedSession {
        table_id: row.get::<i32, _>("table_id") as u32,
        game: row
            .get::<String, _>("game_type")
            .parse()
            .unwrap_or(GameType::Snooker),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        duration_minutes: row.get("duration_minutes"),
        amount: row.get("amount"),
        rate: row.get("rate"),
        staff: row.get::<Option<String>, _>("staff").unwrap_or_default(),
        date: row.get("session_date"),
    }
}

// ---------------------------------------------------------------------------
// In-memory double
// ---------------------------------------------------------------------------

/// Deterministic in-memory implementation of both ports.
///
/// Mirrors the PostgreSQL semantics (lazy daily reset, phone uniqueness,
/// cascade delete) behind one mutex, so concurrent postings serialize the
/// same way a database transaction would. The failure switch lets tests
/// exercise the persistence-failure path.
#[derive(Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    customers: std::collections::BTreeMap<i64, Customer>,
    transactions: Vec<Transaction>,
    sessions: Vec<FinishedSession>,
    next_customer_id: i64,
    next_transaction_id: i64,
    fail_session_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `save_session` calls fail, or succeed again.
    pub fn fail_session_saves(&self, fail: bool) {
        self.lock().fail_session_saves = fail;
    }

    /// Number of sessions saved so far
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Copy of every saved session, in insertion order
    pub fn sessions(&self) -> Vec<FinishedSession> {
        self.lock().sessions.clone()
    }

    /// Copy of every transaction, in insertion order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

impl MemoryInner {
    fn push_transaction(
        &mut self,
        customer_id: i64,
        amount: f64,
        kind: TransactionKind,
        game: Option<GameType>,
        description: &str,
        staff: &str,
    ) {
        self.next_transaction_id += 1;
        self.transactions.push(Transaction {
            id: self.next_transaction_id,
            customer_id,
            amount,
            kind,
            game,
            description: Some(description.to_string()),
            staff: Some(staff.to_string()),
            created_at: Utc::now(),
        });
    }
}

/// Zero the rolling today-figures if this is the first touch on a new date.
fn apply_daily_reset(customer: &mut Customer, date: NaiveDate) {
    if customer.last_updated_date != Some(date) {
        customer.today_amount = 0.0;
        customer.today_minutes = 0.0;
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(&self, session: &FinishedSession) -> StorageResult<()> {
        let mut inner = self.lock();
        if inner.fail_session_saves {
            return Err(StorageError::Unavailable("session store is down".into()));
        }
        inner.sessions.push(session.clone());
        Ok(())
    }

    async fn recent_sessions(
        &self,
        game: GameType,
        table_id: u32,
        limit: i64,
    ) -> StorageResult<Vec<FinishedSession>> {
        let inner = self.lock();
        Ok(inner
            .sessions
            .iter()
            .rev()
            .filter(|s| s.game == game && s.table_id == table_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn insert_customer(&self, name: &str, phone: &str, date: NaiveDate) -> LedgerResult<i64> {
        let mut inner = self.lock();
        if inner.customers.values().any(|c| c.phone == phone) {
            return Err(LedgerError::DuplicatePhone(phone.to_string()));
        }

        inner.next_customer_id += 1;
        let id = inner.next_customer_id;
        inner.customers.insert(
            id,
            Customer {
                id,
                name: name.to_string(),
                phone: phone.to_string(),
                total_amount: 0.0,
                total_minutes: 0.0,
                snooker_amount: 0.0,
                snooker_minutes: 0.0,
                pool_amount: 0.0,
                pool_minutes: 0.0,
                today_amount: 0.0,
                today_minutes: 0.0,
                last_session_amount: 0.0,
                last_session_minutes: 0.0,
                last_session_at: None,
                last_updated_date: Some(date),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn fetch_customer(&self, customer_id: i64) -> LedgerResult<Option<Customer>> {
        Ok(self.lock().customers.get(&customer_id).cloned())
    }

    async fn search(&self, term: &str) -> LedgerResult<Vec<Customer>> {
        let needle = term.to_lowercase();
        let mut matches: Vec<Customer> = self
            .lock()
            .customers
            .values()
            .filter(|c| c.name.to_lowercase().contains(&needle) || c.phone.contains(term))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }

    async fn all_customers(&self) -> LedgerResult<Vec<Customer>> {
        let mut customers: Vec<Customer> = self.lock().customers.values().cloned().collect();
        customers.sort_by(|a, b| {
            b.total_amount
                .partial_cmp(&a.total_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        Ok(customers)
    }

    async fn post_charge(&self, posting: &ChargePosting) -> LedgerResult<()> {
        let mut inner = self.lock();
        let customer = inner
            .customers
            .get_mut(&posting.customer_id)
            .ok_or(LedgerError::CustomerNotFound(posting.customer_id))?;

        apply_daily_reset(customer, posting.date);

        customer.total_amount += posting.amount;
        customer.total_minutes += posting.minutes;
        match posting.game {
            GameType::Snooker => {
                customer.snooker_amount += posting.amount;
                customer.snooker_minutes += posting.minutes;
            }
            GameType::Pool => {
                customer.pool_amount += posting.amount;
                customer.pool_minutes += posting.minutes;
            }
        }
        customer.today_amount += posting.amount;
        customer.today_minutes += posting.minutes;
        customer.last_session_amount = posting.amount;
        customer.last_session_minutes = posting.minutes;
        customer.last_session_at = Some(Utc::now());
        customer.last_updated_date = Some(posting.date);

        inner.push_transaction(
            posting.customer_id,
            posting.amount,
            TransactionKind::Session,
            Some(posting.game),
            &posting.description,
            &posting.staff,
        );
        Ok(())
    }

    async fn adjust_balance(&self, adjustment: &BalanceAdjustment) -> LedgerResult<()> {
        let mut inner = self.lock();
        let customer = inner
            .customers
            .get_mut(&adjustment.customer_id)
            .ok_or(LedgerError::CustomerNotFound(adjustment.customer_id))?;

        apply_daily_reset(customer, adjustment.date);

        customer.total_amount += adjustment.amount;
        customer.today_amount += adjustment.amount;
        customer.last_updated_date = Some(adjustment.date);

        inner.push_transaction(
            adjustment.customer_id,
            adjustment.amount,
            adjustment.kind,
            None,
            &adjustment.description,
            &adjustment.staff,
        );
        Ok(())
    }

    async fn today_stats(&self, date: NaiveDate) -> LedgerResult<TodayStats> {
        let inner = self.lock();
        let mut stats = TodayStats {
            total_customers: inner.customers.len() as i64,
            ..TodayStats::default()
        };

        for customer in inner.customers.values() {
            if customer.last_updated_date == Some(date) {
                stats.today_amount += customer.today_amount;
                stats.today_minutes += customer.today_minutes;
            }
        }

        for tx in &inner.transactions {
            // Postings carry local dates, so compare in local time.
            if tx.created_at.with_timezone(&chrono::Local).date_naive() == date {
                match tx.game {
                    Some(GameType::Snooker) => stats.snooker_amount += tx.amount,
                    Some(GameType::Pool) => stats.pool_amount += tx.amount,
                    None => {}
                }
            }
        }

        Ok(stats)
    }

    async fn top_customers(&self, limit: i64) -> LedgerResult<Vec<TopCustomer>> {
        let customers = self.all_customers().await?;
        Ok(customers
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|c| TopCustomer {
                name: c.name,
                total_amount: c.total_amount,
            })
            .collect())
    }

    async fn transactions_for(
        &self,
        customer_id: i64,
        limit: i64,
    ) -> LedgerResult<Vec<Transaction>> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .rev()
            .filter(|t| t.customer_id == customer_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update_contact(&self, customer_id: i64, name: &str, phone: &str) -> LedgerResult<()> {
        let mut inner = self.lock();
        if inner
            .customers
            .values()
            .any(|c| c.id != customer_id && c.phone == phone)
        {
            return Err(LedgerError::DuplicatePhone(phone.to_string()));
        }

        let customer = inner
            .customers
            .get_mut(&customer_id)
            .ok_or(LedgerError::CustomerNotFound(customer_id))?;
        customer.name = name.to_string();
        customer.phone = phone.to_string();
        Ok(())
    }

    async fn delete_customer(&self, customer_id: i64) -> LedgerResult<()> {
        let mut inner = self.lock();
        if inner.customers.remove(&customer_id).is_none() {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }
        inner.transactions.retain(|t| t.customer_id != customer_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(customer_id: i64, amount: f64, minutes: f64, day: NaiveDate) -> ChargePosting {
        ChargePosting {
            customer_id,
            amount,
            minutes,
            game: GameType::Snooker,
            description: "Snooker session".to_string(),
            staff: "admin".to_string(),
            date: day,
        }
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let store = MemoryStore::new();
        store
            .insert_customer("Asha", "9876543210", date(2025, 6, 1))
            .await
            .unwrap();
        let err = store
            .insert_customer("Someone Else", "9876543210", date(2025, 6, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicatePhone(_)));
    }

    #[tokio::test]
    async fn posting_moves_every_balance_and_appends_audit() {
        let store = MemoryStore::new();
        let id = store
            .insert_customer("Asha", "9876543210", date(2025, 6, 1))
            .await
            .unwrap();

        store
            .post_charge(&posting(id, 10.0, 2.5, date(2025, 6, 1)))
            .await
            .unwrap();

        let c = store.fetch_customer(id).await.unwrap().unwrap();
        assert_eq!(c.total_amount, 10.0);
        assert_eq!(c.total_minutes, 2.5);
        assert_eq!(c.snooker_amount, 10.0);
        assert_eq!(c.pool_amount, 0.0);
        assert_eq!(c.today_amount, 10.0);
        assert_eq!(c.last_session_amount, 10.0);
        assert!(c.last_session_at.is_some());

        let audit = store.transactions_for(id, 10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].kind, TransactionKind::Session);
        assert_eq!(audit[0].amount, 10.0);
        assert_eq!(audit[0].game, Some(GameType::Snooker));
    }

    #[tokio::test]
    async fn today_totals_reset_on_first_touch_of_a_new_date() {
        let store = MemoryStore::new();
        let id = store
            .insert_customer("Asha", "9876543210", date(2025, 6, 1))
            .await
            .unwrap();

        let day1 = date(2025, 6, 1);
        let day2 = date(2025, 6, 2);

        store.post_charge(&posting(id, 10.0, 2.5, day1)).await.unwrap();
        store.post_charge(&posting(id, 4.0, 1.0, day1)).await.unwrap();

        let c = store.fetch_customer(id).await.unwrap().unwrap();
        assert_eq!(c.today_amount, 14.0);
        assert_eq!(c.today_minutes, 3.5);

        // First write on the next day starts today over.
        store.post_charge(&posting(id, 6.0, 1.5, day2)).await.unwrap();
        let c = store.fetch_customer(id).await.unwrap().unwrap();
        assert_eq!(c.today_amount, 6.0);
        assert_eq!(c.today_minutes, 1.5);
        assert_eq!(c.total_amount, 20.0);
        assert_eq!(c.last_updated_date, Some(day2));
    }

    #[tokio::test]
    async fn adjustment_touches_totals_and_today_only() {
        let store = MemoryStore::new();
        let id = store
            .insert_customer("Asha", "9876543210", date(2025, 6, 1))
            .await
            .unwrap();

        store
            .adjust_balance(&BalanceAdjustment {
                customer_id: id,
                amount: -5.0,
                kind: TransactionKind::Debit,
                description: "Manual subtraction by admin".to_string(),
                staff: "admin".to_string(),
                date: date(2025, 6, 1),
            })
            .await
            .unwrap();

        let c = store.fetch_customer(id).await.unwrap().unwrap();
        assert_eq!(c.total_amount, -5.0);
        assert_eq!(c.today_amount, -5.0);
        assert_eq!(c.total_minutes, 0.0);
        assert_eq!(c.snooker_amount, 0.0);

        let audit = store.transactions_for(id, 10).await.unwrap();
        assert_eq!(audit[0].kind, TransactionKind::Debit);
        assert_eq!(audit[0].game, None);
    }

    #[tokio::test]
    async fn delete_cascades_transactions() {
        let store = MemoryStore::new();
        let id = store
            .insert_customer("Asha", "9876543210", date(2025, 6, 1))
            .await
            .unwrap();
        store
            .post_charge(&posting(id, 10.0, 2.5, date(2025, 6, 1)))
            .await
            .unwrap();

        store.delete_customer(id).await.unwrap();
        assert!(store.fetch_customer(id).await.unwrap().is_none());
        assert!(store.transactions().is_empty());

        assert!(matches!(
            store.delete_customer(id).await,
            Err(LedgerError::CustomerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn recent_sessions_come_back_newest_first() {
        let store = MemoryStore::new();
        for i in 1..=4 {
            let session = FinishedSession {
                table_id: 1,
                game: GameType::Pool,
                start_time: "10:00:00".to_string(),
                end_time: "10:30:00".to_string(),
                duration_minutes: f64::from(i),
                amount: 2.0 * f64::from(i),
                rate: 2.0,
                staff: "admin".to_string(),
                date: date(2025, 6, 1),
            };
            store.save_session(&session).await.unwrap();
        }

        let recent = store
            .recent_sessions(GameType::Pool, 1, 3)
            .await
            .unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].duration_minutes, 4.0);
        assert_eq!(recent[2].duration_minutes, 2.0);

        assert!(store
            .recent_sessions(GameType::Snooker, 1, 3)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failure_switch_rejects_saves() {
        let store = MemoryStore::new();
        store.fail_session_saves(true);
        let session = FinishedSession {
            table_id: 1,
            game: GameType::Snooker,
            start_time: "10:00:00".to_string(),
            end_time: "10:05:00".to_string(),
            duration_minutes: 5.0,
            amount: 20.0,
            rate: 4.0,
            staff: "admin".to_string(),
            date: date(2025, 6, 1),
        };
        assert!(store.save_session(&session).await.is_err());

        store.fail_session_saves(false);
        store.save_session(&session).await.unwrap();
        assert_eq!(store.session_count(), 1);
    }
}
