//! Prediction commands: classify a candidate or estimate its radius

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

use crate::client::{ApiClient, ClassificationResponse, RegressionResponse};
use crate::output::{
    color_confidence, color_prediction, format_latency, format_percent, metric_rows, print_json,
    print_table, print_warning, top_features, FieldRow, OutputFormat,
};

/// Feature the radius model is trained without
const CLASSIFIER_ONLY_FEATURE: &str = "koi_ror";

/// Number of feature importances shown after a prediction
const TOP_FEATURES: usize = 5;

/// Built-in candidate inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// A confirmed Kepler planet
    Confirmed,
    /// An eclipsing-binary false positive
    FalsePositive,
}

const SAMPLE_CONFIRMED: &[(&str, f64)] = &[
    ("koi_period", 9.488),
    ("koi_duration", 2.9575),
    ("koi_depth", 615.8),
    ("koi_impact", 0.146),
    ("koi_model_snr", 35.8),
    ("koi_num_transits", 142.0),
    ("koi_ror", 0.0223),
    ("st_teff", 5762.0),
    ("st_logg", 4.426),
    ("st_met", 0.14),
    ("st_mass", 0.985),
    ("st_radius", 0.989),
    ("st_dens", 1.469),
    ("teff_err1", 123.0),
    ("teff_err2", -123.0),
    ("logg_err1", 0.068),
    ("logg_err2", -0.243),
    ("feh_err1", 0.15),
    ("feh_err2", -0.15),
    ("mass_err1", 0.1315),
    ("mass_err2", -0.0868),
    ("radius_err1", 0.465),
    ("radius_err2", -0.114),
];

const SAMPLE_FALSE_POSITIVE: &[(&str, f64)] = &[
    ("koi_period", 1.737),
    ("koi_duration", 2.406),
    ("koi_depth", 8079.2),
    ("koi_impact", 1.276),
    ("koi_model_snr", 505.6),
    ("koi_num_transits", 621.0),
    ("koi_ror", 0.387),
    ("st_teff", 5805.0),
    ("st_logg", 4.546),
    ("st_met", -0.52),
    ("st_mass", 0.831),
    ("st_radius", 0.803),
    ("st_dens", 2.312),
    ("teff_err1", 157.0),
    ("teff_err2", -144.0),
    ("logg_err1", 0.053),
    ("logg_err2", -0.223),
    ("feh_err1", 0.3),
    ("feh_err2", -0.26),
    ("mass_err1", 0.1),
    ("mass_err2", -0.072),
    ("radius_err1", 0.364),
    ("radius_err2", -0.068),
];

impl Sample {
    pub fn inputs(&self) -> Map<String, Value> {
        let values = match self {
            Sample::Confirmed => SAMPLE_CONFIRMED,
            Sample::FalsePositive => SAMPLE_FALSE_POSITIVE,
        };
        values
            .iter()
            .map(|(name, value)| (name.to_string(), Value::from(*value)))
            .collect()
    }
}

/// Which model a prediction command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Classifier,
    Regressor,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file {0} must contain a JSON object")]
    NotAnObject(String),

    #[error("expected key=value, got '{0}'")]
    BadAssignment(String),

    #[error("value for '{key}' must be a number or null, got '{value}'")]
    NotANumber { key: String, value: String },

    #[error("no inputs given; use --sample, --file or --set")]
    Empty,
}

/// Parse one `--set key=value` override; `null` clears the feature
pub fn parse_assignment(assignment: &str) -> std::result::Result<(String, Value), InputError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| InputError::BadAssignment(assignment.to_string()))?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err(InputError::BadAssignment(assignment.to_string()));
    }

    if value.eq_ignore_ascii_case("null") {
        return Ok((key.to_string(), Value::Null));
    }
    let number: f64 = value.parse().map_err(|_| InputError::NotANumber {
        key: key.to_string(),
        value: value.to_string(),
    })?;
    Ok((key.to_string(), Value::from(number)))
}

/// Layer sample, file and overrides into one request body
pub fn build_inputs(
    target: Target,
    sample: Option<Sample>,
    file: Option<&Path>,
    assignments: &[String],
) -> Result<Map<String, Value>> {
    let mut inputs = sample.map(|s| s.inputs()).unwrap_or_default();

    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        match parsed {
            Value::Object(fields) => inputs.extend(fields),
            _ => return Err(InputError::NotAnObject(path.display().to_string()).into()),
        }
    }

    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        inputs.insert(key, value);
    }

    if inputs.is_empty() {
        return Err(InputError::Empty.into());
    }

    if target == Target::Regressor {
        inputs.remove(CLASSIFIER_ONLY_FEATURE);
    }

    Ok(inputs)
}

/// Submit a candidate to the classifier
pub async fn classify(
    client: &ApiClient,
    inputs: &Map<String, Value>,
    format: OutputFormat,
) -> Result<()> {
    let result = client.classify(inputs).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    warn_missing(inputs);
    print_table(&classification_rows(&result));
    print_importance(&result.feature_importance);
    Ok(())
}

/// Submit a candidate to the radius regressor
pub async fn regress(
    client: &ApiClient,
    inputs: &Map<String, Value>,
    format: OutputFormat,
) -> Result<()> {
    let result = client.regress(inputs).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    warn_missing(inputs);
    print_table(&regression_rows(&result));
    print_importance(&result.feature_importance);
    Ok(())
}

fn classification_rows(result: &ClassificationResponse) -> Vec<FieldRow> {
    let mut rows = vec![
        FieldRow::new("Prediction", color_prediction(&result.prediction)),
        FieldRow::new("Confidence", color_confidence(result.confidence)),
        FieldRow::new("P(confirmed)", format_percent(result.prob_confirmed)),
        FieldRow::new("P(false positive)", format_percent(result.prob_false_positive)),
        FieldRow::new("Latency", format_latency(result.latency_ms)),
    ];
    rows.extend(metric_rows("model", &result.model_metrics));
    rows
}

fn regression_rows(result: &RegressionResponse) -> Vec<FieldRow> {
    let [lower, upper] = result.confidence_interval;
    let mut rows = vec![
        FieldRow::new(
            "Radius",
            format!("{:.4} R⊕", result.prediction_earth_radii),
        ),
        FieldRow::new("Interval", format!("{:.4} - {:.4} R⊕", lower, upper)),
        FieldRow::new("Size category", result.size_category.clone()),
        FieldRow::new("Latency", format_latency(result.latency_ms)),
    ];
    rows.extend(metric_rows("model", &result.model_metrics));
    rows
}

fn print_importance(importance: &std::collections::BTreeMap<String, f64>) {
    let rows: Vec<FieldRow> = top_features(importance, TOP_FEATURES)
        .into_iter()
        .map(|(name, weight)| FieldRow::new(name, format!("{:.4}", weight)))
        .collect();
    if !rows.is_empty() {
        println!();
        print_table(&rows);
    }
}

fn warn_missing(inputs: &Map<String, Value>) {
    let missing: Vec<&str> = inputs
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(name, _)| name.as_str())
        .collect();
    if !missing.is_empty() {
        print_warning(&format!(
            "Sent without a value (treated as missing): {}",
            missing.join(", ")
        ));
    }
}
