//! Feature extraction for ML inference
//!
//! Maps a JSON request body onto the fixed feature order a model was trained
//! with. Absent and null fields become NaN so the model's own imputation
//! handles them; anything that cannot be read as a number is rejected.

use crate::error::{PredictError, Result};
use crate::models::{FeatureSchema, FeatureVector};
use serde_json::{Map, Value};

/// Value substituted for absent or null features
pub const MISSING_VALUE: f64 = f64::NAN;

/// Extracts schema-ordered feature vectors from request bodies
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Extract features from an arbitrary JSON body, which must be an object
    pub fn extract_value(&self, body: &Value) -> Result<FeatureVector> {
        match body {
            Value::Object(fields) => self.extract(fields),
            other => Err(PredictError::validation(format!(
                "request body must be a JSON object, got {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn extract(&self, input: &Map<String, Value>) -> Result<FeatureVector> {
        let values = self
            .schema
            .names()
            .iter()
            .map(|name| coerce(name, input.get(name)))
            .collect::<Result<Vec<f64>>>()?;
        Ok(FeatureVector::new(values))
    }
}

fn coerce(name: &str, value: Option<&Value>) -> Result<f64> {
    match value {
        None | Some(Value::Null) => Ok(MISSING_VALUE),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| PredictError::invalid_field(name, "number out of range")),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            PredictError::invalid_field(name, format!("could not convert string to float: '{}'", s))
        }),
        Some(other) => Err(PredictError::invalid_field(
            name,
            format!("expected a number, got {}", json_type_name(other)),
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
