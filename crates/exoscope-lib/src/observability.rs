//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (request latency, prediction/error counts, history reads, artifact info)
//! - Structured JSON logging with tracing

use crate::artifacts::ArtifactInfo;
use crate::error::ErrorKind;
use crate::models::TaskKind;
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter, register_int_counter_vec,
    GaugeVec, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    history_reads_total: IntCounter,
    model_artifact_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "exoscope_prediction_latency_seconds",
                "Time from request receipt to prediction log write",
                &["task"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "exoscope_predictions_total",
                "Predictions served and logged",
                &["task"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "exoscope_prediction_errors_total",
                "Prediction requests that failed",
                &["task", "kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            history_reads_total: register_int_counter!(
                "exoscope_history_reads_total",
                "Reads of the prediction history"
            )
            .expect("Failed to register history_reads_total"),

            model_artifact_info: register_gauge_vec!(
                "exoscope_model_artifact_info",
                "Checksum of each loaded model artifact",
                &["model", "sha256"]
            )
            .expect("Failed to register model_artifact_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction(&self, task: TaskKind, latency_ms: f64) {
        let inner = self.inner();
        inner
            .prediction_latency_seconds
            .with_label_values(&[task.as_str()])
            .observe(latency_ms / 1000.0);
        inner
            .predictions_total
            .with_label_values(&[task.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, task: TaskKind, kind: ErrorKind) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[task.as_str(), kind.as_str()])
            .inc();
    }

    pub fn inc_history_reads(&self) {
        self.inner().history_reads_total.inc();
    }

    pub fn set_model_artifact(&self, model: &str, info: &ArtifactInfo) {
        self.inner()
            .model_artifact_info
            .with_label_values(&[model, info.sha256.as_str()])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions and
/// lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, classifier: &ArtifactInfo, regressor: &ArtifactInfo) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            classifier_sha256 = %classifier.sha256,
            regressor_sha256 = %regressor.sha256,
            "Prediction service started"
        );
    }

    /// Log a completed prediction
    pub fn log_prediction(
        &self,
        record_id: i64,
        task: TaskKind,
        summary: &str,
        missing_features: usize,
        latency_ms: f64,
    ) {
        info!(
            event = "prediction_completed",
            service = %self.service,
            record_id = record_id,
            task = %task,
            outcome = %summary,
            missing_features = missing_features,
            latency_ms = latency_ms,
            "Prediction served"
        );
    }

    /// Log a failed prediction
    pub fn log_prediction_failed(&self, task: TaskKind, kind: ErrorKind, error: &str) {
        match kind {
            ErrorKind::Validation => info!(
                event = "prediction_failed",
                service = %self.service,
                task = %task,
                kind = kind.as_str(),
                error = %error,
                "Prediction request rejected"
            ),
            _ => warn!(
                event = "prediction_failed",
                service = %self.service,
                task = %task,
                kind = kind.as_str(),
                error = %error,
                "Prediction failed"
            ),
        }
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}
