//! ML prediction engine

mod features;
mod inference;
mod output;

pub use features::{FeatureExtractor, MISSING_VALUE};
pub use inference::{
    normalize_probabilities, radius_from_log, Classification, Disposition, InferenceAdapter,
    InferenceStats, OnnxModel, CONFIRMED_THRESHOLD, MIN_RADIUS,
};
pub use output::{
    round_to, ClassificationResult, PredictionResult, RegressionResult, ResponseBuilder,
    SizeCategory, LATENCY_DECIMALS, RESULT_DECIMALS,
};

use crate::error::Result;
use crate::models::{ClassProbabilities, FeatureVector};

/// Trait for the candidate disposition model
pub trait Classifier: Send + Sync {
    /// Raw class probabilities as `[FALSE POSITIVE, CONFIRMED]`
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities>;
}

/// Trait for the planet radius model
pub trait Regressor: Send + Sync {
    /// Raw model output, i.e. `log1p` of the radius in Earth radii
    fn predict_log_radius(&self, features: &FeatureVector) -> Result<f64>;
}
