//! Core data models for the prediction service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered feature names a model was trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Feature values positionally aligned to a [`FeatureSchema`]; missing values are NaN
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_nan()).count()
    }
}

/// Which of the two models served a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Classification,
    Regression,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Classification => "classification",
            TaskKind::Regression => "regression",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model metadata document shipped next to the model artifacts
///
/// Keys the service does not interpret are kept in `extra` so `/metadata`
/// returns the document as it was written by the training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Classifier feature order
    pub features: FeatureSchema,
    /// Regressor feature order
    pub reg_features: FeatureSchema,
    #[serde(default)]
    pub clf_metrics: Map<String, Value>,
    #[serde(default)]
    pub reg_metrics: Map<String, Value>,
    #[serde(default)]
    pub clf_feature_importance: BTreeMap<String, f64>,
    #[serde(default)]
    pub reg_feature_importance: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn schema(&self, task: TaskKind) -> &FeatureSchema {
        match task {
            TaskKind::Classification => &self.features,
            TaskKind::Regression => &self.reg_features,
        }
    }

    pub fn metrics(&self, task: TaskKind) -> &Map<String, Value> {
        match task {
            TaskKind::Classification => &self.clf_metrics,
            TaskKind::Regression => &self.reg_metrics,
        }
    }

    pub fn feature_importance(&self, task: TaskKind) -> &BTreeMap<String, f64> {
        match task {
            TaskKind::Classification => &self.clf_feature_importance,
            TaskKind::Regression => &self.reg_feature_importance,
        }
    }
}

/// Class probability distribution over {FALSE POSITIVE, CONFIRMED}
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub false_positive: f64,
    pub confirmed: f64,
}

/// A persisted request/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    /// UTC, ISO-8601 without offset suffix
    pub timestamp: String,
    pub task: String,
    pub inputs: Value,
    pub result: Value,
    pub latency_ms: f64,
}
