//! HTTP front end for the thermal conductivity predictor.
//!
//! Wraps one shared [`Predictor`] with the operator-facing state (compliance
//! threshold, measurement history, cached chart image) and serves it as JSON.

pub mod admin_routes;
pub mod auth;
pub mod brute_force;
pub mod config;
pub mod history;
pub mod predict_routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use conductivity_core::{Predictor, PredictorConfig, PredictorError};
use tokio::sync::RwLock;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AdminPin, PinError};
use crate::brute_force::PinGuard;
use crate::config::ServerConfig;
use crate::history::MeasurementHistory;

// ─── State ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub threshold: Arc<RwLock<f64>>,
    pub history: Arc<RwLock<MeasurementHistory>>,
    /// Base64 payload of the last saved chart, without the data-URL prefix
    pub chart_image: Arc<RwLock<Option<String>>>,
    pub admin_pin: Arc<AdminPin>,
    pub pin_guard: Arc<PinGuard>,
}

impl AppState {
    pub fn new(predictor: Predictor, config: &ServerConfig) -> Self {
        Self {
            predictor: Arc::new(predictor),
            threshold: Arc::new(RwLock::new(config.default_threshold)),
            history: Arc::new(RwLock::new(MeasurementHistory::new(config.history_capacity))),
            chart_image: Arc::new(RwLock::new(None)),
            admin_pin: Arc::new(AdminPin::new(&config.admin_pin)),
            pin_guard: Arc::new(PinGuard::new(
                config.pin_max_failures,
                config.pin_failure_window,
                config.pin_lockout,
            )),
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Handler error: a status code plus the underlying cause.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        }
        let body = serde_json::json!({ "detail": self.error.to_string() });
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<PredictorError> for AppError {
    fn from(error: PredictorError) -> Self {
        let status = match &error {
            PredictorError::FractionSum { .. }
            | PredictorError::InvalidFractions { .. }
            | PredictorError::InvalidMeasurement(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, error.into())
    }
}

impl From<PinError> for AppError {
    fn from(error: PinError) -> Self {
        let status = match error {
            PinError::Invalid => StatusCode::FORBIDDEN,
            PinError::Locked => StatusCode::TOO_MANY_REQUESTS,
        };
        Self::with_status(status, error.into())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("model task failed: {error}"),
        )
    }
}

// ─── Router ─────────────────────────────────────────────────────────────────

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Thermal conductivity prediction API" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub fn app(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(predict_routes::router())
        .merge(admin_routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logs = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;

    // Initial fit runs the full leave-one-out pass
    let predictor = tokio::task::spawn_blocking(|| {
        Predictor::with_seed_data(PredictorConfig::default())
    })
    .await
    .context("model initialization task panicked")??;
    tracing::info!(
        "Predictor ready with {} samples, threshold {}",
        predictor.samples_count(),
        config.default_threshold
    );

    let state = AppState::new(predictor, &config);

    let guard = Arc::clone(&state.pin_guard);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            guard.cleanup();
        }
    });

    let router = app(state, &config);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
