//! Append-only prediction log backed by SQLite
//!
//! Every operation opens its own connection and drops it before returning;
//! SQLite's file locking serializes concurrent writers.

use crate::error::Result;
use crate::models::{PredictionRecord, TaskKind};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum number of records returned by [`PredictionLog::recent`]
pub const HISTORY_LIMIT: usize = 50;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT,
        task TEXT,
        inputs TEXT,
        result TEXT,
        latency_ms REAL
    )";

/// Handle to the prediction log file
#[derive(Debug, Clone)]
pub struct PredictionLog {
    path: PathBuf,
}

impl PredictionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table if absent; safe to call any number of times
    pub fn init(&self) -> Result<()> {
        self.open().map(drop)
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(conn)
    }

    /// Record one completed prediction, returning the assigned id
    pub fn append<I, R>(&self, task: TaskKind, inputs: &I, result: &R, latency_ms: f64) -> Result<i64>
    where
        I: Serialize + ?Sized,
        R: Serialize + ?Sized,
    {
        let inputs = serde_json::to_string(inputs)?;
        let result = serde_json::to_string(result)?;
        let timestamp = chrono::Utc::now()
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();

        let conn = self.open()?;
        conn.execute(
            "INSERT INTO predictions (timestamp, task, inputs, result, latency_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![timestamp, task.as_str(), inputs, result, latency_ms],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, task = %task, "Prediction logged");
        Ok(id)
    }

    /// The most recent records, newest first
    pub fn recent(&self) -> Result<Vec<PredictionRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, task, inputs, result, latency_ms
             FROM predictions ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![HISTORY_LIMIT as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, timestamp, task, inputs, result, latency_ms)| {
                Ok(PredictionRecord {
                    id,
                    timestamp: timestamp.unwrap_or_default(),
                    task: task.unwrap_or_default(),
                    inputs: decode(inputs)?,
                    result: decode(result)?,
                    latency_ms: latency_ms.unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn decode(text: Option<String>) -> Result<serde_json::Value> {
    match text {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_log() -> (TempDir, PredictionLog) {
        let dir = TempDir::new().unwrap();
        let log = PredictionLog::new(dir.path().join("predictions.db"));
        (dir, log)
    }

    #[test]
    fn test_init_is_idempotent() {
        let (_dir, log) = temp_log();
        log.init().unwrap();
        log.append(TaskKind::Regression, &json!({}), &json!({"r": 1.0}), 1.0).unwrap();
        log.init().unwrap();
        assert_eq!(log.recent().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_log() {
        let (_dir, log) = temp_log();
        assert!(log.recent().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_read_back() {
        let (_dir, log) = temp_log();
        let inputs = json!({"koi_period": 9.488, "koi_ror": null});
        let result = json!({"prediction": "CONFIRMED", "confidence": 0.9731});

        let id = log.append(TaskKind::Classification, &inputs, &result, 1.23).unwrap();
        let records = log.recent().unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, id);
        assert_eq!(record.task, "classification");
        assert_eq!(record.inputs, inputs);
        assert_eq!(record.result, result);
        assert_eq!(record.latency_ms, 1.23);
        assert!(chrono::NaiveDateTime::parse_from_str(&record.timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[test]
    fn test_recent_is_newest_first_and_capped() {
        let (_dir, log) = temp_log();
        for i in 0..(HISTORY_LIMIT + 7) {
            log.append(TaskKind::Regression, &json!({"i": i}), &json!({"i": i}), i as f64)
                .unwrap();
        }

        let records = log.recent().unwrap();
        assert_eq!(records.len(), HISTORY_LIMIT);
        assert!(records.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(records[0].result["i"], HISTORY_LIMIT + 6);
    }

    #[test]
    fn test_unwritable_path_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let log = PredictionLog::new(dir.path().join("missing").join("predictions.db"));
        let err = log.init().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
