//! Recent prediction history

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value;
use tabled::Tabled;

use crate::client::{ApiClient, HistoryRecord};
use crate::output::{format_latency, format_percent, print_json, print_table, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskFilter {
    Classification,
    Regression,
}

impl TaskFilter {
    fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::Classification => "classification",
            TaskFilter::Regression => "regression",
        }
    }
}

/// Row for the history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Time (UTC)")]
    timestamp: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Result")]
    outcome: String,
    #[tabled(rename = "Latency")]
    latency: String,
}

impl From<&HistoryRecord> for HistoryRow {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            id: record.id,
            timestamp: format_timestamp(&record.timestamp),
            task: record.task.clone(),
            outcome: summarize(&record.task, &record.result),
            latency: format_latency(record.latency_ms),
        }
    }
}

/// Stored timestamps are naive UTC with microseconds; show them to the second
fn format_timestamp(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// One-line outcome of a stored result
fn summarize(task: &str, result: &Value) -> String {
    match task {
        "classification" => {
            let prediction = result["prediction"].as_str().unwrap_or("?");
            match result["confidence"].as_f64() {
                Some(confidence) => format!("{} ({})", prediction, format_percent(confidence)),
                None => prediction.to_string(),
            }
        }
        "regression" => {
            let category = result["size_category"].as_str().unwrap_or("?");
            match result["prediction_earth_radii"].as_f64() {
                Some(radius) => format!("{:.2} R⊕ ({})", radius, category),
                None => category.to_string(),
            }
        }
        _ => result.to_string(),
    }
}

/// Show the most recent predictions, optionally for one task only
pub async fn show_history(
    client: &ApiClient,
    task: Option<TaskFilter>,
    format: OutputFormat,
) -> Result<()> {
    let records: Vec<HistoryRecord> = client
        .history()
        .await?
        .into_iter()
        .filter(|r| task.map(|t| r.task == t.as_str()).unwrap_or(true))
        .collect();

    if format == OutputFormat::Json {
        return print_json(&records);
    }

    let rows: Vec<HistoryRow> = records.iter().map(HistoryRow::from).collect();
    print_table(&rows);
    Ok(())
}
