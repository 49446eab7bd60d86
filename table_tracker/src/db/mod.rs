//! Database module providing PostgreSQL connection pooling and the storage
//! ports the core depends on.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod repository;

pub use config::DatabaseConfig;
pub use repository::{
    CustomerStore, MemoryStore, PgCustomerStore, PgSessionStore, SessionStore, StorageError,
};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a connection pool with the given configuration.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check that the database answers queries.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the schema if it does not exist yet. Safe to run on every
    /// startup.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        log::info!("database schema ready");
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        phone TEXT UNIQUE NOT NULL,
        total_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        total_minutes DOUBLE PRECISION NOT NULL DEFAULT 0,
        snooker_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        snooker_minutes DOUBLE PRECISION NOT NULL DEFAULT 0,
        pool_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        pool_minutes DOUBLE PRECISION NOT NULL DEFAULT 0,
        today_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        today_minutes DOUBLE PRECISION NOT NULL DEFAULT 0,
        last_session_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        last_session_minutes DOUBLE PRECISION NOT NULL DEFAULT 0,
        last_session_at TIMESTAMPTZ,
        last_updated_date DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id BIGSERIAL PRIMARY KEY,
        customer_id BIGINT NOT NULL REFERENCES customers (id) ON DELETE CASCADE,
        amount DOUBLE PRECISION NOT NULL,
        kind TEXT NOT NULL,
        game_type TEXT,
        description TEXT,
        staff TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id BIGSERIAL PRIMARY KEY,
        table_id INT NOT NULL,
        game_type TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        duration_minutes DOUBLE PRECISION NOT NULL,
        amount DOUBLE PRECISION NOT NULL,
        rate DOUBLE PRECISION NOT NULL,
        staff TEXT,
        session_date DATE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_customers_phone ON customers (phone)",
    "CREATE INDEX IF NOT EXISTS idx_customers_name ON customers (name)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_customer ON transactions (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions (session_date)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_table ON sessions (game_type, table_id)",
];
