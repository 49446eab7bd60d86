//! Table tracker HTTP server.
//!
//! Wires the table timer engine and the customer ledger to their PostgreSQL
//! stores and exposes them as a JSON API.

mod api;
mod config;
mod logging;
mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use config::ServerConfig;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use table_tracker::db::{Database, PgCustomerStore, PgSessionStore};
use table_tracker::{LedgerManager, TableManager};

const HELP: &str = "\
Run the table tracker server

USAGE:
  tt_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Optional Prometheus scrape address (e.g., 127.0.0.1:9090)
  SNOOKER_TABLE_COUNT      Number of snooker tables  [default: 3]
  POOL_TABLE_COUNT         Number of pool tables     [default: 3]
  RUST_LOG                 Log filter (e.g., info,sqlx=warn)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    info!("Starting table tracker server at {}", config.bind);
    info!("Connecting to database: {}", config.database.database_url);

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
    db.init_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize schema: {e}"))?;

    info!("Database connected");

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics on http://{addr}/metrics");
    }

    // Wire the core managers to their PostgreSQL stores.
    let session_store = Arc::new(PgSessionStore::new(db.pool().clone()));
    let customer_store = Arc::new(PgCustomerStore::new(db.pool().clone()));

    let tables = Arc::new(TableManager::new(config.tables.clone(), session_store));
    let seeded = tables.seed_recent_sessions().await;
    info!(
        "Engine ready: {} snooker / {} pool tables, {} recent sessions loaded",
        config.tables.snooker_rates.len(),
        config.tables.pool_rates.len(),
        seeded
    );

    let ledger = Arc::new(LedgerManager::new(customer_store));

    let state = api::AppState {
        tables,
        ledger,
        db: Arc::new(db),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
