use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    routing::{get, post},
    Json, Router,
};
use conductivity_core::RobustnessReport;
use serde::{Deserialize, Serialize};

use crate::auth::check_pin;
use crate::config::{is_valid_threshold, MAX_THRESHOLD};
use crate::history::MeasurementRecord;
use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    pub pin: String,
    pub threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct ThresholdUpdated {
    pub success: bool,
    pub new_threshold: f64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub pin: String,
    /// Most recent records to return, all retained ones when absent
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub measurements: Vec<MeasurementRecord>,
    pub count: usize,
    pub total_recorded: u64,
    pub current_threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub samples_count: usize,
    pub robustness: Option<RobustnessReport>,
}

type ClientAddr = Option<ConnectInfo<SocketAddr>>;

fn client_id(addr: &ClientAddr) -> String {
    addr.as_ref()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn authorize(state: &AppState, addr: &ClientAddr, pin: &str) -> Result<(), AppError> {
    check_pin(&state.admin_pin, &state.pin_guard, &client_id(addr), pin)?;
    Ok(())
}

/// GET /current-threshold
async fn current_threshold(State(state): State<AppState>) -> Json<serde_json::Value> {
    let threshold = *state.threshold.read().await;
    Json(serde_json::json!({ "threshold": threshold }))
}

/// POST /verify-pin
///
/// A wrong PIN is a normal `{valid: false}` answer here, but still counts
/// toward the lockout.
async fn verify_pin(
    State(state): State<AppState>,
    addr: ClientAddr,
    Json(req): Json<PinRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let client = client_id(&addr);
    let valid = match check_pin(&state.admin_pin, &state.pin_guard, &client, &req.pin) {
        Ok(()) => true,
        Err(crate::auth::PinError::Invalid) => false,
        Err(e) => return Err(e.into()),
    };
    Ok(Json(serde_json::json!({ "valid": valid })))
}

/// POST /update-threshold
async fn update_threshold(
    State(state): State<AppState>,
    addr: ClientAddr,
    Json(req): Json<ThresholdUpdate>,
) -> Result<Json<ThresholdUpdated>, AppError> {
    authorize(&state, &addr, &req.pin)?;

    if !is_valid_threshold(req.threshold) {
        return Err(AppError::bad_request(format!(
            "Threshold must be between 0 and {MAX_THRESHOLD} W/(m·K)"
        )));
    }

    let previous = std::mem::replace(&mut *state.threshold.write().await, req.threshold);
    tracing::info!("Threshold changed from {} to {}", previous, req.threshold);

    Ok(Json(ThresholdUpdated {
        success: true,
        new_threshold: req.threshold,
        message: format!("Threshold updated to {} W/(m·K)", req.threshold),
    }))
}

/// GET /admin/history?pin=&limit=
async fn history(
    State(state): State<AppState>,
    addr: ClientAddr,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    authorize(&state, &addr, &query.pin)?;

    let (measurements, total_recorded) = {
        let history = state.history.read().await;
        let limit = query.limit.unwrap_or(history.len());
        (history.latest(limit), history.total_recorded())
    };
    let current_threshold = *state.threshold.read().await;

    Ok(Json(HistoryResponse {
        count: measurements.len(),
        measurements,
        total_recorded,
        current_threshold,
    }))
}

/// GET /admin/model?pin=
async fn model_status(
    State(state): State<AppState>,
    addr: ClientAddr,
    Query(query): Query<PinRequest>,
) -> Result<Json<ModelStatus>, AppError> {
    authorize(&state, &addr, &query.pin)?;

    let snapshot = state.predictor.snapshot();
    Ok(Json(ModelStatus {
        samples_count: snapshot.training().len(),
        robustness: snapshot.robustness(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/current-threshold", get(current_threshold))
        .route("/verify-pin", post(verify_pin))
        .route("/update-threshold", post(update_threshold))
        .route("/admin/history", get(history))
        .route("/admin/model", get(model_status))
}
