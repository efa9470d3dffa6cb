//! Core library for the ExoScope prediction service
//!
//! This crate provides:
//! - Model artifact and metadata loading
//! - Feature extraction and ONNX inference for the disposition and radius models
//! - Result assembly and the SQLite prediction log
//! - Metrics and structured logging

pub mod artifacts;
pub mod error;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod store;

pub use error::{ErrorKind, PredictError, Result};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use service::{ArtifactPaths, HealthReport, PredictionService};
pub use store::PredictionLog;
