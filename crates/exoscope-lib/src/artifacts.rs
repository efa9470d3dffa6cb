//! Startup loading of model artifacts and the metadata document

use crate::error::{PredictError, Result};
use crate::models::Metadata;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Identity of a model file as loaded at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Raw bytes of a model file plus its identity
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub bytes: Vec<u8>,
    pub info: ArtifactInfo,
}

/// Read a model file, rejecting empty files
pub fn read_model(path: &Path) -> Result<ModelArtifact> {
    let bytes = std::fs::read(path).map_err(|e| startup_error(path, e))?;
    if bytes.is_empty() {
        return Err(startup_error(path, "file is empty"));
    }

    let sha256 = compute_checksum(&bytes);
    info!(
        path = %path.display(),
        size = bytes.len(),
        checksum = %sha256,
        "Model artifact read"
    );

    let info = ArtifactInfo {
        path: path.to_path_buf(),
        sha256,
        size_bytes: bytes.len(),
    };
    Ok(ModelArtifact { bytes, info })
}

/// Read and validate the metadata document
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let content = std::fs::read_to_string(path).map_err(|e| startup_error(path, e))?;
    let metadata: Metadata =
        serde_json::from_str(&content).map_err(|e| startup_error(path, e))?;

    if metadata.features.is_empty() {
        return Err(startup_error(path, "'features' is empty"));
    }
    if metadata.reg_features.is_empty() {
        return Err(startup_error(path, "'reg_features' is empty"));
    }

    info!(
        path = %path.display(),
        clf_features = metadata.features.len(),
        reg_features = metadata.reg_features.len(),
        "Model metadata loaded"
    );
    Ok(metadata)
}

fn startup_error(path: &Path, message: impl std::fmt::Display) -> PredictError {
    PredictError::startup(path.display().to_string(), message)
}
