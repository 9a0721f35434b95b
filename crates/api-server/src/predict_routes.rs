use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use conductivity_core::{Fractions, PredictionResult, SampleAdded};
use serde::{Deserialize, Serialize};

use crate::history::{MeasurementRecord, RecordedPrediction};
use crate::{AppError, AppState};

// ─── Types ──────────────────────────────────────────────────────────────────

/// Target band per sieve bucket, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimalRanges {
    pub taux_2mm: [f64; 2],
    pub taux_1mm: [f64; 2],
    pub taux_500um: [f64; 2],
    pub taux_250um: [f64; 2],
    pub taux_0: [f64; 2],
}

pub const OPTIMAL_RANGES: OptimalRanges = OptimalRanges {
    taux_2mm: [12.0, 18.0],
    taux_1mm: [53.0, 58.0],
    taux_500um: [19.0, 24.0],
    taux_250um: [4.0, 7.0],
    taux_0: [0.0, 1.0],
};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub optimal_ranges: OptimalRanges,
    /// Data URL of the last saved chart, empty when none was saved
    pub chart_image: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveChartRequest {
    pub chart_image: String,
    #[serde(default)]
    pub fractions: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct AddSampleRequest {
    pub fractions: Fractions,
    pub lambda_value: f64,
}

// ─── Handlers ───────────────────────────────────────────────────────────────

/// POST /predict
async fn predict(
    State(state): State<AppState>,
    Json(fractions): Json<Fractions>,
) -> Result<Json<PredictResponse>, AppError> {
    let threshold = *state.threshold.read().await;

    let predictor = state.predictor.clone();
    let prediction =
        tokio::task::spawn_blocking(move || predictor.predict(&fractions, threshold)).await??;

    state.history.write().await.push(MeasurementRecord {
        fractions,
        prediction: RecordedPrediction {
            lambda_predicted: prediction.lambda_predicted,
            confidence_interval: prediction.confidence_interval,
            status: prediction.status,
            threshold_used: threshold,
        },
        timestamp: Utc::now(),
    });

    let chart_image = state
        .chart_image
        .read()
        .await
        .as_ref()
        .map(|payload| format!("data:image/png;base64,{payload}"))
        .unwrap_or_default();

    Ok(Json(PredictResponse {
        prediction,
        optimal_ranges: OPTIMAL_RANGES,
        chart_image,
    }))
}

/// POST /save-chart-image
async fn save_chart_image(
    State(state): State<AppState>,
    Json(req): Json<SaveChartRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = strip_data_url(&req.chart_image);
    if payload.is_empty() {
        return Err(AppError::bad_request("chart_image is empty"));
    }
    if req.fractions.is_some() {
        tracing::debug!("Chart image saved alongside fractions {:?}", req.fractions);
    }

    *state.chart_image.write().await = Some(payload.to_string());
    Ok(Json(serde_json::json!({ "message": "Chart image saved" })))
}

/// POST /add-laboratory-sample
async fn add_laboratory_sample(
    State(state): State<AppState>,
    Json(req): Json<AddSampleRequest>,
) -> Result<Json<SampleAdded>, AppError> {
    let predictor = state.predictor.clone();
    let added = tokio::task::spawn_blocking(move || {
        predictor.add_sample(&req.fractions, req.lambda_value)
    })
    .await??;

    Ok(Json(added))
}

/// Keep only what follows the last comma of a data URL.
pub fn strip_data_url(image: &str) -> &str {
    image.rsplit(',').next().unwrap_or(image).trim()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict-image", post(predict))
        .route("/save-chart-image", post(save_chart_image))
        .route("/add-laboratory-sample", post(add_laboratory_sample))
}
