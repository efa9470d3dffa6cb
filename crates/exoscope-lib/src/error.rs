//! Error taxonomy for the prediction pipeline

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PredictError>;

/// Errors raised while loading artifacts or serving a prediction
#[derive(Debug, Error)]
pub enum PredictError {
    /// Request body or one of its fields could not be turned into features
    #[error("invalid input: {message}")]
    Validation {
        message: String,
        /// Offending feature name, when the failure is field specific
        field: Option<String>,
    },

    /// Model evaluation failed or produced unusable output
    #[error("inference failed: {0}")]
    Inference(String),

    /// Prediction log could not be written or read
    #[error("prediction log error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Stored row could not be decoded back into JSON
    #[error("prediction log holds malformed JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled
    #[error("prediction log task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Missing or unreadable model/metadata artifact
    #[error("failed to load {artifact}: {message}")]
    Startup { artifact: String, message: String },
}

/// Coarse error classes used for status codes and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Inference,
    Storage,
    Startup,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Inference => "inference",
            ErrorKind::Storage => "storage",
            ErrorKind::Startup => "startup",
        }
    }
}

impl PredictError {
    pub fn validation(message: impl Into<String>) -> Self {
        PredictError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        PredictError::Validation {
            message: format!("feature '{}': {}", field, message.into()),
            field: Some(field.to_string()),
        }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        PredictError::Inference(message.into())
    }

    pub fn startup(artifact: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PredictError::Startup {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictError::Validation { .. } => ErrorKind::Validation,
            PredictError::Inference(_) => ErrorKind::Inference,
            PredictError::Storage(_) | PredictError::Corrupt(_) | PredictError::Task(_) => {
                ErrorKind::Storage
            }
            PredictError::Startup { .. } => ErrorKind::Startup,
        }
    }

    /// Messages of this error and every underlying source, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}
