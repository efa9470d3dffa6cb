//! Server configuration

use anyhow::{Context, Result};
use exoscope_lib::ArtifactPaths;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port; `PORT` takes precedence over `EXOSCOPE_PORT`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory relative artifact and database paths resolve against
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Classifier ONNX model
    #[serde(default = "default_clf_model")]
    pub clf_model: PathBuf,

    /// Regressor ONNX model
    #[serde(default = "default_reg_model")]
    pub reg_model: PathBuf,

    /// Feature lists, metrics and importances
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,

    /// SQLite prediction log
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_clf_model() -> PathBuf {
    PathBuf::from("clf_pipeline.onnx")
}

fn default_reg_model() -> PathBuf {
    PathBuf::from("reg_pipeline.onnx")
}

fn default_metadata() -> PathBuf {
    PathBuf::from("model_metadata.json")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("predictions.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            artifact_dir: default_artifact_dir(),
            clf_model: default_clf_model(),
            reg_model: default_reg_model(),
            metadata: default_metadata(),
            db_path: default_db_path(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Load configuration from `vars` instead of the process environment
    /// when given
    pub fn from_env(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let port = match &vars {
            Some(vars) => vars.get("PORT").cloned(),
            None => std::env::var("PORT").ok(),
        };

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("EXOSCOPE")
                    .try_parsing(true)
                    .source(vars),
            )
            .set_override_option("port", port)?
            .build()
            .context("failed to read EXOSCOPE_* environment")?;

        config
            .try_deserialize()
            .context("invalid server configuration")
    }

    /// Resolve `path` against the artifact directory unless it is absolute
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.artifact_dir.join(path)
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            classifier: self.resolve(&self.clf_model),
            regressor: self.resolve(&self.reg_model),
            metadata: self.resolve(&self.metadata),
            database: self.resolve(&self.db_path),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_env(vars(&[])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");

        let paths = config.artifact_paths();
        assert_eq!(paths.classifier, PathBuf::from("./clf_pipeline.onnx"));
        assert_eq!(paths.database, PathBuf::from("./predictions.db"));
    }

    #[test]
    fn test_port_override_wins() {
        let config =
            ServerConfig::from_env(vars(&[("EXOSCOPE_PORT", "6000"), ("PORT", "7000")])).unwrap();
        assert_eq!(config.port, 7000);

        let config = ServerConfig::from_env(vars(&[("EXOSCOPE_PORT", "6000")])).unwrap();
        assert_eq!(config.port, 6000);
    }

    #[test]
    fn test_paths_resolve_against_artifact_dir() {
        let config = ServerConfig::from_env(vars(&[
            ("EXOSCOPE_ARTIFACT_DIR", "/srv/models"),
            ("EXOSCOPE_DB_PATH", "/var/lib/exoscope/log.db"),
            ("EXOSCOPE_METADATA", "meta.json"),
        ]))
        .unwrap();

        let paths = config.artifact_paths();
        assert_eq!(paths.metadata, PathBuf::from("/srv/models/meta.json"));
        assert_eq!(paths.regressor, PathBuf::from("/srv/models/reg_pipeline.onnx"));
        assert_eq!(paths.database, PathBuf::from("/var/lib/exoscope/log.db"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(ServerConfig::from_env(vars(&[("PORT", "not-a-port")])).is_err());
    }
}
