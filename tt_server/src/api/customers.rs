//! Customer endpoints: registration, charges, adjustments, and split bills.

use super::{ApiError, AppState, ErrorResponse, ledger_error};
use crate::metrics;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use table_tracker::ledger::{
    Customer, SplitFailure, TodayStats, TopCustomer, Transaction, TransactionKind,
};
use table_tracker::tables::GameType;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<Customer>,
    pub today_stats: TodayStats,
    pub top_customers: Vec<TopCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionParams {
    #[serde(default = "default_transaction_limit")]
    pub limit: i64,
}

fn default_transaction_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    pub amount: f64,
    pub minutes: f64,
    pub game: GameType,
    pub description: Option<String>,
    pub staff: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub amount: f64,
    pub kind: TransactionKind,
    pub staff: String,
    /// Role claimed by the front-of-house UI; negative adjustments are
    /// admin-only
    #[serde(default)]
    pub actor_role: String,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub customer_ids: Vec<i64>,
    pub per_player_amount: f64,
    pub per_player_minutes: f64,
    pub game: GameType,
    pub table_id: u32,
    pub staff: String,
}

#[derive(Debug, Serialize)]
pub struct SplitResponse {
    pub message: String,
    pub applied: Vec<i64>,
    pub failed: Vec<SplitFailure>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleParams {
    #[serde(default)]
    pub actor_role: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn forbidden(reason: &str) -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: reason.to_string(),
        }),
    )
}

/// Register a new customer.
pub async fn register_customer(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let id = state
        .ledger
        .register_customer(&request.name, &request.phone)
        .await
        .map_err(|e| ledger_error(&e))?;

    metrics::customer_registered();

    Ok(Json(RegisterResponse {
        id,
        message: format!("Customer {} added", request.name.trim()),
    }))
}

/// All customers plus today's venue figures and the top spenders.
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<CustomerListResponse>, ApiError> {
    let customers = state
        .ledger
        .get_all_customers()
        .await
        .map_err(|e| ledger_error(&e))?;
    let today_stats = state
        .ledger
        .get_today_stats()
        .await
        .map_err(|e| ledger_error(&e))?;
    let top_customers = state
        .ledger
        .get_top_customers(5)
        .await
        .map_err(|e| ledger_error(&e))?;

    Ok(Json(CustomerListResponse {
        customers,
        today_stats,
        top_customers,
    }))
}

/// Search customers by name or phone fragment.
pub async fn search_customers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state
        .ledger
        .search_customers(&params.term)
        .await
        .map_err(|e| ledger_error(&e))?;
    Ok(Json(customers))
}

/// A customer's most recent transactions.
pub async fn customer_transactions(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Query(params): Query<TransactionParams>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    // Surface a 404 for unknown customers instead of an empty list.
    state
        .ledger
        .get_customer(customer_id)
        .await
        .map_err(|e| ledger_error(&e))?;

    let transactions = state
        .ledger
        .get_transactions(customer_id, params.limit)
        .await
        .map_err(|e| ledger_error(&e))?;
    Ok(Json(transactions))
}

/// Assign a finished session's charge to a customer.
pub async fn assign_charge(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let description = request
        .description
        .unwrap_or_else(|| format!("{} session", request.game.title()));

    state
        .ledger
        .post_charge(
            customer_id,
            request.amount,
            request.minutes,
            &description,
            &request.staff,
            request.game,
        )
        .await
        .map_err(|e| ledger_error(&e))?;

    metrics::charge_posted(&request.game.to_string());

    Ok(Json(MessageResponse {
        message: format!("{:.2} added to customer balance", request.amount),
    }))
}

/// Manually adjust a customer's balance. Negative amounts are admin-only.
pub async fn adjust_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.amount < 0.0 && request.actor_role != "admin" {
        return Err(forbidden("Only admins can subtract from a balance"));
    }

    state
        .ledger
        .adjust_balance(customer_id, request.amount, request.kind, &request.staff)
        .await
        .map_err(|e| ledger_error(&e))?;

    let verb = if request.amount >= 0.0 {
        "added to"
    } else {
        "subtracted from"
    };
    Ok(Json(MessageResponse {
        message: format!("{:.2} {} customer balance", request.amount.abs(), verb),
    }))
}

/// Split a session's bill across several players.
///
/// Always answers 200: a partially-failed split is a report, not an error.
/// Players charged before a failure stay charged.
pub async fn split_charge(
    State(state): State<AppState>,
    Json(request): Json<SplitRequest>,
) -> Result<Json<SplitResponse>, ApiError> {
    let outcome = state
        .ledger
        .split_charge(
            &request.customer_ids,
            request.per_player_amount,
            request.per_player_minutes,
            request.game,
            request.table_id,
            &request.staff,
        )
        .await
        .map_err(|e| ledger_error(&e))?;

    for _ in &outcome.applied {
        metrics::charge_posted(&request.game.to_string());
    }

    let message = if outcome.all_applied() {
        format!("Split bill assigned to {} players", outcome.applied.len())
    } else {
        format!(
            "Split bill assigned to {} of {} players",
            outcome.applied.len(),
            request.customer_ids.len()
        )
    };

    Ok(Json(SplitResponse {
        message,
        applied: outcome.applied,
        failed: outcome.failed,
    }))
}

/// Update a customer's name and phone.
pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .ledger
        .update_contact(customer_id, &request.name, &request.phone)
        .await
        .map_err(|e| ledger_error(&e))?;

    Ok(Json(MessageResponse {
        message: "Customer information updated".to_string(),
    }))
}

/// Delete a customer and their transactions. Admin-only.
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Query(params): Query<RoleParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    if params.actor_role != "admin" {
        return Err(forbidden("Only admins can delete customers"));
    }

    state
        .ledger
        .delete_customer(customer_id)
        .await
        .map_err(|e| ledger_error(&e))?;

    Ok(Json(MessageResponse {
        message: "Customer deleted".to_string(),
    }))
}
