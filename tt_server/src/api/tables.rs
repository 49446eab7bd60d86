//! Table endpoints: listing, actions, rates, and the status summary.

use super::{ApiError, AppState, table_error};
use crate::metrics;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use table_tracker::tables::{EngineStatus, FinishedSession, GameType, TableAction, TableView};

#[derive(Debug, Serialize)]
pub struct TableListResponse {
    pub game_type: GameType,
    pub tables: BTreeMap<u32, TableView>,
    pub available_rates: Vec<f64>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: TableAction,
    pub staff: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub message: String,
    pub session: Option<FinishedSession>,
    /// False when the finalized session could not be durably saved; the
    /// in-memory state already committed and operators must reconcile.
    pub persisted: bool,
    /// Whether the UI should prompt to assign the charge to a customer
    pub prompt_assignment: bool,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub tables: EngineStatus,
    pub timestamp: String,
}

fn parse_game(segment: &str) -> Result<GameType, ApiError> {
    segment.parse::<GameType>().map_err(|e| table_error(&e))
}

/// List every table of one game type with its live view.
pub async fn list_tables(
    State(state): State<AppState>,
    Path(game): Path<String>,
) -> Result<Json<TableListResponse>, ApiError> {
    let game = parse_game(&game)?;
    let tables = state
        .tables
        .get_tables(game)
        .await
        .map_err(|e| table_error(&e))?;

    Ok(Json(TableListResponse {
        game_type: game,
        tables,
        available_rates: state.tables.available_rates().to_vec(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Start, pause, or end a table.
pub async fn table_action(
    State(state): State<AppState>,
    Path((game, table_id)): Path<(String, u32)>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let game = parse_game(&game)?;
    let result = state
        .tables
        .handle_table_action(game, table_id, request.action, &request.staff)
        .await
        .map_err(|e| table_error(&e))?;

    if result.session.is_some() {
        metrics::session_ended(&game.to_string(), result.persisted);
    }

    Ok(Json(ActionResponse {
        message: result.message,
        session: result.session,
        persisted: result.persisted,
        prompt_assignment: result.prompt_assignment,
    }))
}

/// Change an idle table's rate.
pub async fn update_rate(
    State(state): State<AppState>,
    Path((game, table_id)): Path<(String, u32)>,
    Json(request): Json<RateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let game = parse_game(&game)?;
    let message = state
        .tables
        .update_table_rate(game, table_id, request.rate)
        .await
        .map_err(|e| table_error(&e))?;

    Ok(Json(MessageResponse { message }))
}

/// Clear a table's recent-sessions display window.
pub async fn clear_sessions(
    State(state): State<AppState>,
    Path((game, table_id)): Path<(String, u32)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let game = parse_game(&game)?;
    state
        .tables
        .clear_recent_sessions(game, table_id)
        .await
        .map_err(|e| table_error(&e))?;

    Ok(Json(MessageResponse {
        message: "Recent sessions display cleared".to_string(),
    }))
}

/// Running/paused/idle counts per game type.
pub async fn system_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let tables = state.tables.status().await.map_err(|e| table_error(&e))?;

    Ok(Json(StatusResponse {
        tables,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
