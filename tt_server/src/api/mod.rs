//! HTTP JSON API for the table tracker.
//!
//! Thin plumbing only: handlers parse the request, call into the core
//! managers, and translate structured results into status codes. No business
//! logic lives here.
//!
//! # Endpoints
//!
//! ```text
//! GET    /health
//! GET    /api/v1/status
//! GET    /api/v1/{game}/tables
//! POST   /api/v1/{game}/tables/{id}/action
//! POST   /api/v1/{game}/tables/{id}/rate
//! POST   /api/v1/{game}/tables/{id}/clear-sessions
//! POST   /api/v1/customers
//! GET    /api/v1/customers
//! GET    /api/v1/customers/search?term=
//! GET    /api/v1/customers/{id}/transactions
//! POST   /api/v1/customers/{id}/charge
//! POST   /api/v1/customers/{id}/adjust
//! POST   /api/v1/customers/split-charge
//! PUT    /api/v1/customers/{id}
//! DELETE /api/v1/customers/{id}
//! ```
//!
//! There is no authentication layer; the tracker runs on a trusted
//! front-of-house network and the UI supplies the acting staff member with
//! each request.

pub mod customers;
pub mod tables;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use table_tracker::db::Database;
use table_tracker::ledger::LedgerError;
use table_tracker::tables::TableError;
use table_tracker::{LedgerManager, TableManager};
use tower_http::cors::CorsLayer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<TableManager>,
    pub ledger: Arc<LedgerManager>,
    pub db: Arc<Database>,
}

/// Structured error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn table_error(err: &TableError) -> ApiError {
    let status = match err {
        TableError::UnknownGameType(_) | TableError::UnknownTable { .. } => StatusCode::NOT_FOUND,
        TableError::EngineClosed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub(crate) fn ledger_error(err: &LedgerError) -> ApiError {
    let status = match err {
        LedgerError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::DuplicatePhone(_) => StatusCode::CONFLICT,
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Create the complete API router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(tables::system_status))
        .route("/{game}/tables", get(tables::list_tables))
        .route("/{game}/tables/{table_id}/action", post(tables::table_action))
        .route("/{game}/tables/{table_id}/rate", post(tables::update_rate))
        .route(
            "/{game}/tables/{table_id}/clear-sessions",
            post(tables::clear_sessions),
        )
        .route(
            "/customers",
            get(customers::list_customers).post(customers::register_customer),
        )
        .route("/customers/search", get(customers::search_customers))
        .route("/customers/split-charge", post(customers::split_charge))
        .route(
            "/customers/{customer_id}/transactions",
            get(customers::customer_transactions),
        )
        .route("/customers/{customer_id}/charge", post(customers::assign_charge))
        .route("/customers/{customer_id}/adjust", post(customers::adjust_balance))
        .route(
            "/customers/{customer_id}",
            put(customers::update_customer).delete(customers::delete_customer),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Server health status, including database reachability.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok" })),
        ),
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unreachable" })),
            )
        }
    }
}
