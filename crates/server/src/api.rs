//! HTTP API for predictions, history, health and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use exoscope_lib::{ErrorKind, PredictError, PredictionService, StructuredLogger};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Request failure rendered as `{error, trace}`
#[derive(Debug)]
pub struct ApiError(PredictError);

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": self.0.to_string(),
            "trace": self.0.chain(),
        });
        (status, Json(body)).into_response()
    }
}

/// Parse a request body as JSON whatever its declared content type
fn parse_body(body: &Bytes) -> Result<Value, PredictError> {
    serde_json::from_slice(body)
        .map_err(|e| PredictError::validation(format!("request body is not valid JSON: {}", e)))
}

async fn root() -> &'static str {
    "ExoScope Backend Running"
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.health())
}

async fn metadata(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.metadata().clone())
}

async fn predict_classification(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let received = Instant::now();
    let body = parse_body(&body)?;
    let result = state.service.classify(body, received).await?;
    Ok(Json(result))
}

async fn predict_regression(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let received = Instant::now();
    let body = parse_body(&body)?;
    let result = state.service.regress(body, received).await?;
    Ok(Json(result))
}

async fn history(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let records = state.service.history().await?;
    Ok(Json(records))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metadata", get(metadata))
        .route("/predict/classification", post(predict_classification))
        .route("/predict/regression", post(predict_regression))
        .route("/history", get(history))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and run until SIGINT or SIGTERM
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let logger = state.service.logger().clone();
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(logger))
        .await?;

    Ok(())
}

async fn shutdown_signal(logger: StructuredLogger) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => "SIGINT received",
        _ = terminate => "SIGTERM received",
    };
    logger.log_shutdown(reason);
}
