//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Explicit flag first, then the config file's default
    pub fn resolve(explicit: Option<OutputFormat>, configured: Option<&str>) -> Self {
        explicit
            .or_else(|| configured.and_then(|s| OutputFormat::from_str(s, true).ok()))
            .unwrap_or_default()
    }
}

/// One row of a two-column field/value table
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability as percentage
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Format latency in milliseconds
pub fn format_latency(latency_ms: Option<f64>) -> String {
    match latency_ms {
        Some(ms) => format!("{:.2} ms", ms),
        None => "-".to_string(),
    }
}

/// Format a metric value, keeping non-numeric values as JSON
pub fn format_metric(value: &Value) -> String {
    match value.as_f64() {
        Some(v) => format!("{:.4}", v),
        None => value.to_string(),
    }
}

/// Metrics as table rows, in key order
pub fn metric_rows(prefix: &str, metrics: &Map<String, Value>) -> Vec<FieldRow> {
    metrics
        .iter()
        .map(|(name, value)| FieldRow::new(format!("{} {}", prefix, name), format_metric(value)))
        .collect()
}

/// The `n` most important features, highest first
pub fn top_features(importance: &BTreeMap<String, f64>, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = importance
        .iter()
        .map(|(name, weight)| (name.clone(), *weight))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Color a disposition label
pub fn color_prediction(prediction: &str) -> String {
    match prediction {
        "CONFIRMED" => prediction.green().bold().to_string(),
        "FALSE POSITIVE" => prediction.red().bold().to_string(),
        _ => prediction.to_string(),
    }
}

/// Color a status string
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ok" | "healthy" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_percent(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_resolution() {
        assert_eq!(OutputFormat::resolve(None, None), OutputFormat::Table);
        assert_eq!(OutputFormat::resolve(None, Some("JSON")), OutputFormat::Json);
        assert_eq!(OutputFormat::resolve(None, Some("yaml")), OutputFormat::Table);
        assert_eq!(
            OutputFormat::resolve(Some(OutputFormat::Table), Some("json")),
            OutputFormat::Table
        );
    }

    #[test]
    fn test_top_features_ranked() {
        let importance = BTreeMap::from([
            ("koi_depth".to_string(), 0.1),
            ("koi_ror".to_string(), 0.5),
            ("koi_model_snr".to_string(), 0.3),
        ]);
        let top = top_features(&importance, 2);
        assert_eq!(top[0].0, "koi_ror");
        assert_eq!(top[1].0, "koi_model_snr");
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_percent(0.9731), "97.3%");
        assert_eq!(format_latency(Some(1.5)), "1.50 ms");
        assert_eq!(format_latency(None), "-");
        assert_eq!(format_metric(&json!(0.912345)), "0.9123");
        assert_eq!(format_metric(&json!("n/a")), "\"n/a\"");
    }
}
