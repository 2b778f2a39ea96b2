//! Dashboard API route handlers.
//!
//! All endpoints return JSON and proxy straight to the controller
//! actor through its command handle.

use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::ControllerHandle;
use crate::types::{BalancePoint, BotState};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub step: usize,
    pub wins: u64,
    pub losses: u64,
    pub total_profit: Decimal,
    pub last_observed: Option<Decimal>,
    pub cycle_delay_ms: u64,
    pub test_mode: bool,
    pub win_rate: f64,
}

impl From<BotState> for StatusResponse {
    fn from(state: BotState) -> Self {
        let win_rate = state.win_rate();
        Self {
            running: state.running,
            step: state.step,
            wins: state.wins,
            losses: state.losses,
            total_profit: state.total_profit,
            last_observed: state.last_observed,
            cycle_delay_ms: state.cycle_delay_ms,
            test_mode: state.test_mode,
            win_rate,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StartRequest {
    #[serde(default)]
    pub cycle_delay_ms: Option<u64>,
    #[serde(default)]
    pub test_mode: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(
    State(handle): State<ControllerHandle>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let state = handle
        .state()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(state.into()))
}

/// GET /api/balance-history
pub async fn get_balance_history(
    State(handle): State<ControllerHandle>,
) -> Result<Json<Vec<BalancePoint>>, StatusCode> {
    let history = handle
        .balance_history()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(history))
}

/// POST /api/start
pub async fn start(
    State(handle): State<ControllerHandle>,
    Json(req): Json<StartRequest>,
) -> Result<Json<ActionResponse>, StatusCode> {
    let cycle_delay_ms = req.cycle_delay_ms.unwrap_or(1000);
    let test_mode = req.test_mode.unwrap_or(false);
    handle
        .start(cycle_delay_ms, test_mode)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(ActionResponse { ok: true }))
}

/// POST /api/stop
pub async fn stop(
    State(handle): State<ControllerHandle>,
) -> Result<Json<ActionResponse>, StatusCode> {
    handle
        .stop()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(ActionResponse { ok: true }))
}

/// POST /api/reset
pub async fn reset(
    State(handle): State<ControllerHandle>,
) -> Result<Json<ActionResponse>, StatusCode> {
    handle
        .reset()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(ActionResponse { ok: true }))
}

/// POST /api/clear-history
pub async fn clear_history(
    State(handle): State<ControllerHandle>,
) -> Result<Json<ActionResponse>, StatusCode> {
    handle
        .clear_balance_history()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(ActionResponse { ok: true }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
