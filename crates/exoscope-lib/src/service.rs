//! Prediction request pipeline
//!
//! [`PredictionService`] is built once at startup and shared read-only by
//! every request: feature extraction, inference, response assembly and the
//! prediction log write all run through it.

use crate::artifacts::{read_metadata, read_model, ArtifactInfo};
use crate::error::{PredictError, Result};
use crate::models::{Metadata, PredictionRecord, TaskKind};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{
    round_to, Classifier, FeatureExtractor, InferenceAdapter, InferenceStats, OnnxModel,
    PredictionResult, Regressor, ResponseBuilder, LATENCY_DECIMALS,
};
use crate::store::PredictionLog;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Locations of everything the service needs at startup
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub regressor: PathBuf,
    pub metadata: PathBuf,
    pub database: PathBuf,
}

/// Identity of the loaded models, reported by the health endpoint
#[derive(Debug, Clone, Default)]
struct LoadedArtifacts {
    classifier: Option<ArtifactInfo>,
    regressor: Option<ArtifactInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub num_features: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsStatus {
    pub classifier: ModelStatus,
    pub regressor: ModelStatus,
}

/// Body of the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub models: ModelsStatus,
    pub clf_metrics: Map<String, Value>,
    pub reg_metrics: Map<String, Value>,
}

/// Immutable, process-wide prediction service
pub struct PredictionService {
    metadata: Arc<Metadata>,
    clf_extractor: FeatureExtractor,
    reg_extractor: FeatureExtractor,
    adapter: InferenceAdapter,
    responses: ResponseBuilder,
    log: PredictionLog,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
    artifacts: LoadedArtifacts,
}

impl PredictionService {
    pub fn new(
        metadata: Metadata,
        classifier: Arc<dyn Classifier>,
        regressor: Arc<dyn Regressor>,
        log: PredictionLog,
    ) -> Self {
        let metadata = Arc::new(metadata);
        Self {
            clf_extractor: FeatureExtractor::new(metadata.features.clone()),
            reg_extractor: FeatureExtractor::new(metadata.reg_features.clone()),
            adapter: InferenceAdapter::new(classifier, regressor),
            responses: ResponseBuilder::new(metadata.clone()),
            metadata,
            log,
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::new(env!("CARGO_PKG_NAME")),
            artifacts: LoadedArtifacts::default(),
        }
    }

    /// Load metadata and both ONNX models, and prepare the prediction log
    ///
    /// Any failure here is fatal: a prediction service without its models
    /// has nothing to serve.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let metadata = read_metadata(&paths.metadata)?;

        let clf = read_model(&paths.classifier)?;
        let classifier = OnnxModel::new(&clf.bytes, metadata.features.len())
            .map_err(|e| relabel(e, &clf.info))?;

        let reg = read_model(&paths.regressor)?;
        let regressor = OnnxModel::new(&reg.bytes, metadata.reg_features.len())
            .map_err(|e| relabel(e, &reg.info))?;

        let log = PredictionLog::new(paths.database.clone());
        log.init()?;

        let mut service = Self::new(metadata, Arc::new(classifier), Arc::new(regressor), log);
        service.metrics.set_model_artifact("classifier", &clf.info);
        service.metrics.set_model_artifact("regressor", &reg.info);
        service
            .logger
            .log_startup(env!("CARGO_PKG_VERSION"), &clf.info, &reg.info);
        service.artifacts = LoadedArtifacts {
            classifier: Some(clf.info),
            regressor: Some(reg.info),
        };
        Ok(service)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn inference_stats(&self) -> InferenceStats {
        self.adapter.stats()
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub async fn classify(&self, body: Value, received: Instant) -> Result<PredictionResult> {
        self.predict(TaskKind::Classification, body, received).await
    }

    pub async fn regress(&self, body: Value, received: Instant) -> Result<PredictionResult> {
        self.predict(TaskKind::Regression, body, received).await
    }

    /// Run one request through the pipeline
    ///
    /// `received` marks when the request arrived; the latency window closes
    /// just before the log write and is stamped onto the result afterwards.
    pub async fn predict(
        &self,
        task: TaskKind,
        body: Value,
        received: Instant,
    ) -> Result<PredictionResult> {
        let outcome = self.run_pipeline(task, body, received).await;
        if let Err(e) = &outcome {
            self.metrics.inc_prediction_errors(task, e.kind());
            self.logger
                .log_prediction_failed(task, e.kind(), &e.to_string());
        }
        outcome
    }

    async fn run_pipeline(
        &self,
        task: TaskKind,
        body: Value,
        received: Instant,
    ) -> Result<PredictionResult> {
        let features = match task {
            TaskKind::Classification => self.clf_extractor.extract_value(&body)?,
            TaskKind::Regression => self.reg_extractor.extract_value(&body)?,
        };

        let mut result = match task {
            TaskKind::Classification => {
                let classification = self.adapter.classify(&features)?;
                self.responses.classification(&classification)
            }
            TaskKind::Regression => {
                let radius = self.adapter.regress(&features)?;
                self.responses.regression(radius)
            }
        };

        let latency_ms = round_to(received.elapsed().as_secs_f64() * 1000.0, LATENCY_DECIMALS);
        let logged = serde_json::to_value(&result)?;
        let log = self.log.clone();
        let record_id =
            tokio::task::spawn_blocking(move || log.append(task, &body, &logged, latency_ms))
                .await??;

        result.set_latency(latency_ms);
        self.metrics.observe_prediction(task, latency_ms);
        self.logger.log_prediction(
            record_id,
            task,
            &result.summary(),
            features.missing_count(),
            latency_ms,
        );
        Ok(result)
    }

    /// Most recent prediction records, newest first
    pub async fn history(&self) -> Result<Vec<PredictionRecord>> {
        let log = self.log.clone();
        let records = tokio::task::spawn_blocking(move || log.recent()).await??;
        self.metrics.inc_history_reads();
        Ok(records)
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            models: ModelsStatus {
                classifier: model_status(
                    self.metadata.features.len(),
                    self.artifacts.classifier.as_ref(),
                ),
                regressor: model_status(
                    self.metadata.reg_features.len(),
                    self.artifacts.regressor.as_ref(),
                ),
            },
            clf_metrics: self.metadata.clf_metrics.clone(),
            reg_metrics: self.metadata.reg_metrics.clone(),
        }
    }
}

fn model_status(num_features: usize, artifact: Option<&ArtifactInfo>) -> ModelStatus {
    ModelStatus {
        num_features,
        path: artifact.map(|a| a.path.clone()),
        sha256: artifact.map(|a| a.sha256.clone()),
    }
}

fn relabel(err: PredictError, artifact: &ArtifactInfo) -> PredictError {
    match err {
        PredictError::Startup { message, .. } => {
            PredictError::startup(artifact.path.display().to_string(), message)
        }
        other => other,
    }
}
