//! ONNX inference using tract
//!
//! Provides the two model adapters. The trained pipelines are exported to
//! ONNX (classifier with the probability map disabled, so probabilities come
//! out as a plain `[1, 2]` float tensor) and evaluated with tract-onnx.

use super::{Classifier, Regressor};
use crate::error::{PredictError, Result};
use crate::models::{ClassProbabilities, FeatureVector};
use anyhow::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Probability of CONFIRMED at or above which a candidate is labelled CONFIRMED
pub const CONFIRMED_THRESHOLD: f64 = 0.5;

/// Smallest radius (Earth radii) the regressor is allowed to report
pub const MIN_RADIUS: f64 = 0.01;

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

/// Tolerance when checking that class probabilities sum to one
const PROBABILITY_TOLERANCE: f64 = 1e-6;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A loaded ONNX graph with a single `[1, num_features]` float input
pub struct OnnxModel {
    model: TractModel,
    num_features: usize,
}

impl OnnxModel {
    /// Parse and optimize an ONNX model from bytes
    pub fn new(model_bytes: &[u8], num_features: usize) -> Result<Self> {
        let model = Self::load_model(model_bytes, num_features)
            .map_err(|e| PredictError::startup("onnx model", format!("{:#}", e)))?;
        Ok(Self {
            model,
            num_features,
        })
    }

    fn load_model(model_bytes: &[u8], num_features: usize) -> anyhow::Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Convert feature vector to tensor input
    fn features_to_tensor(&self, features: &FeatureVector) -> Result<Tensor> {
        if features.len() != self.num_features {
            return Err(PredictError::inference(format!(
                "feature shape mismatch: model expects {} features, got {}",
                self.num_features,
                features.len()
            )));
        }
        let data: Vec<f32> = features.values().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .map_err(|e| PredictError::inference(e.to_string()))?;
        Ok(array.into())
    }

    /// Run the graph and return every float output, flattened
    fn run(&self, features: &FeatureVector) -> Result<Vec<Vec<f32>>> {
        let input = self.features_to_tensor(features)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictError::inference(format!("{:#}", e)))?;

        let mut floats = Vec::with_capacity(outputs.len());
        for output in outputs.iter() {
            if output.datum_type() != f32::datum_type() {
                continue;
            }
            let view = output
                .to_array_view::<f32>()
                .map_err(|e| PredictError::inference(format!("{:#}", e)))?;
            floats.push(view.iter().copied().collect());
        }
        Ok(floats)
    }
}

impl Classifier for OnnxModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities> {
        let outputs = self.run(features)?;
        let probs = outputs
            .iter()
            .find(|values| values.len() == 2)
            .ok_or_else(|| {
                PredictError::inference("model has no [1, 2] probability output")
            })?;
        Ok(ClassProbabilities {
            false_positive: probs[0] as f64,
            confirmed: probs[1] as f64,
        })
    }
}

impl Regressor for OnnxModel {
    fn predict_log_radius(&self, features: &FeatureVector) -> Result<f64> {
        let outputs = self.run(features)?;
        outputs
            .first()
            .and_then(|values| values.first())
            .map(|v| *v as f64)
            .ok_or_else(|| PredictError::inference("No output from model"))
    }
}

/// Label assigned to a classified candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Confirmed,
    FalsePositive,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Confirmed => "CONFIRMED",
            Disposition::FalsePositive => "FALSE POSITIVE",
        }
    }
}

/// Outcome of the classifier after the decision rule is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub probabilities: ClassProbabilities,
    pub label: Disposition,
}

impl Classification {
    pub fn from_probabilities(probabilities: ClassProbabilities) -> Self {
        let label = if probabilities.confirmed >= CONFIRMED_THRESHOLD {
            Disposition::Confirmed
        } else {
            Disposition::FalsePositive
        };
        Self {
            probabilities,
            label,
        }
    }

    /// Probability of the chosen label
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .confirmed
            .max(self.probabilities.false_positive)
    }
}

/// Uniform predict contract over the two loaded models
pub struct InferenceAdapter {
    classifier: Arc<dyn Classifier>,
    regressor: Arc<dyn Regressor>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl InferenceAdapter {
    pub fn new(classifier: Arc<dyn Classifier>, regressor: Arc<dyn Regressor>) -> Self {
        Self {
            classifier,
            regressor,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Classification> {
        let start = Instant::now();
        let raw = self.classifier.predict_proba(features);
        self.record_timing("classifier", start);
        let probabilities = normalize_probabilities(raw?)?;
        Ok(Classification::from_probabilities(probabilities))
    }

    /// Predicted planet radius in Earth radii
    pub fn regress(&self, features: &FeatureVector) -> Result<f64> {
        let start = Instant::now();
        let raw = self.regressor.predict_log_radius(features);
        self.record_timing("regressor", start);
        radius_from_log(raw?)
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }

    fn record_timing(&self, model: &'static str, start: Instant) {
        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(model, elapsed_ms = elapsed.as_millis() as u64, "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(model, elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Validate raw model probabilities and rescale them to sum to one
pub fn normalize_probabilities(raw: ClassProbabilities) -> Result<ClassProbabilities> {
    let ClassProbabilities {
        false_positive,
        confirmed,
    } = raw;
    if !false_positive.is_finite() || !confirmed.is_finite() {
        return Err(PredictError::inference(format!(
            "non-finite class probabilities [{}, {}]",
            false_positive, confirmed
        )));
    }
    if false_positive < 0.0 || confirmed < 0.0 {
        return Err(PredictError::inference(format!(
            "negative class probabilities [{}, {}]",
            false_positive, confirmed
        )));
    }
    let total = false_positive + confirmed;
    if total <= 0.0 {
        return Err(PredictError::inference("class probabilities sum to zero"));
    }
    if (total - 1.0).abs() <= PROBABILITY_TOLERANCE {
        return Ok(raw);
    }
    Ok(ClassProbabilities {
        false_positive: false_positive / total,
        confirmed: confirmed / total,
    })
}

/// Undo the log1p target transform and clamp to a physical radius
pub fn radius_from_log(log_radius: f64) -> Result<f64> {
    if !log_radius.is_finite() {
        return Err(PredictError::inference(format!(
            "regressor returned non-finite value {}",
            log_radius
        )));
    }
    Ok(log_radius.exp_m1().max(MIN_RADIUS))
}
