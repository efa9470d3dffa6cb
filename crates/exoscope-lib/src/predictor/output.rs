//! Prediction output formatting and post-processing
//!
//! Handles conversion of adapter outputs into the JSON result objects returned
//! to callers and stored in the prediction log.

use super::inference::{Classification, MIN_RADIUS};
use crate::models::{Metadata, TaskKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Decimal places kept for probabilities and radii
pub const RESULT_DECIMALS: i32 = 4;

/// Decimal places kept for latency
pub const LATENCY_DECIMALS: i32 = 2;

/// Relative width of the reported radius interval
pub const INTERVAL_LOWER_FACTOR: f64 = 0.85;
pub const INTERVAL_UPPER_FACTOR: f64 = 1.15;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Planet size class derived from the predicted radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeCategory {
    #[serde(rename = "Sub-Earth")]
    SubEarth,
    #[serde(rename = "Earth-like")]
    EarthLike,
    #[serde(rename = "Super-Earth")]
    SuperEarth,
    #[serde(rename = "Mini-Neptune")]
    MiniNeptune,
    #[serde(rename = "Neptune-like")]
    NeptuneLike,
    #[serde(rename = "Gas Giant")]
    GasGiant,
}

/// Exclusive upper bounds, checked in order
const SIZE_BOUNDS: [(f64, SizeCategory); 5] = [
    (0.8, SizeCategory::SubEarth),
    (1.25, SizeCategory::EarthLike),
    (2.0, SizeCategory::SuperEarth),
    (4.0, SizeCategory::MiniNeptune),
    (10.0, SizeCategory::NeptuneLike),
];

impl SizeCategory {
    pub fn from_radius(radius: f64) -> Self {
        SIZE_BOUNDS
            .iter()
            .find(|(upper, _)| radius < *upper)
            .map(|(_, category)| *category)
            .unwrap_or(SizeCategory::GasGiant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::SubEarth => "Sub-Earth",
            SizeCategory::EarthLike => "Earth-like",
            SizeCategory::SuperEarth => "Super-Earth",
            SizeCategory::MiniNeptune => "Mini-Neptune",
            SizeCategory::NeptuneLike => "Neptune-like",
            SizeCategory::GasGiant => "Gas Giant",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: String,
    pub confidence: f64,
    pub prob_confirmed: f64,
    pub prob_false_positive: f64,
    pub model_metrics: Map<String, Value>,
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub prediction_earth_radii: f64,
    pub confidence_interval: [f64; 2],
    pub size_category: SizeCategory,
    pub model_metrics: Map<String, Value>,
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

/// Result object for either task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Classification(ClassificationResult),
    Regression(RegressionResult),
}

impl PredictionResult {
    pub fn task(&self) -> TaskKind {
        match self {
            PredictionResult::Classification(_) => TaskKind::Classification,
            PredictionResult::Regression(_) => TaskKind::Regression,
        }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            PredictionResult::Classification(r) => r.latency_ms,
            PredictionResult::Regression(r) => r.latency_ms,
        }
    }

    /// Stamp the request latency onto the result
    pub fn set_latency(&mut self, latency_ms: f64) {
        let latency = Some(round_to(latency_ms, LATENCY_DECIMALS));
        match self {
            PredictionResult::Classification(r) => r.latency_ms = latency,
            PredictionResult::Regression(r) => r.latency_ms = latency,
        }
    }

    /// Short human-readable summary, used in log lines
    pub fn summary(&self) -> String {
        match self {
            PredictionResult::Classification(r) => {
                format!("{} ({:.1}%)", r.prediction, r.confidence * 100.0)
            }
            PredictionResult::Regression(r) => {
                format!("{} R_earth ({})", r.prediction_earth_radii, r.size_category)
            }
        }
    }
}

/// Builds result objects, attaching model-level metadata
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    metadata: Arc<Metadata>,
}

impl ResponseBuilder {
    pub fn new(metadata: Arc<Metadata>) -> Self {
        Self { metadata }
    }

    pub fn classification(&self, classification: &Classification) -> PredictionResult {
        let p = classification.probabilities;
        PredictionResult::Classification(ClassificationResult {
            prediction: classification.label.as_str().to_string(),
            confidence: round_to(classification.confidence(), RESULT_DECIMALS),
            prob_confirmed: round_to(p.confirmed, RESULT_DECIMALS),
            prob_false_positive: round_to(p.false_positive, RESULT_DECIMALS),
            model_metrics: self.metadata.metrics(TaskKind::Classification).clone(),
            feature_importance: self
                .metadata
                .feature_importance(TaskKind::Classification)
                .clone(),
            latency_ms: None,
        })
    }

    /// Build a regression result from a radius in Earth radii
    pub fn regression(&self, radius: f64) -> PredictionResult {
        let radius = radius.max(MIN_RADIUS);
        let lower = (radius * INTERVAL_LOWER_FACTOR).max(MIN_RADIUS);
        let upper = radius * INTERVAL_UPPER_FACTOR;

        PredictionResult::Regression(RegressionResult {
            prediction_earth_radii: round_to(radius, RESULT_DECIMALS),
            confidence_interval: [
                round_to(lower, RESULT_DECIMALS),
                round_to(upper, RESULT_DECIMALS),
            ],
            size_category: SizeCategory::from_radius(radius),
            model_metrics: self.metadata.metrics(TaskKind::Regression).clone(),
            feature_importance: self
                .metadata
                .feature_importance(TaskKind::Regression)
                .clone(),
            latency_ms: None,
        })
    }
}
