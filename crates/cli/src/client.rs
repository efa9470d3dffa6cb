//! API client for communicating with the ExoScope server

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

/// API client for the ExoScope server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("health").await
    }

    pub async fn metadata(&self) -> Result<MetadataResponse> {
        self.get("metadata").await
    }

    pub async fn classify(&self, inputs: &Map<String, Value>) -> Result<ClassificationResponse> {
        self.post("predict/classification", inputs).await
    }

    pub async fn regress(&self, inputs: &Map<String, Value>) -> Result<RegressionResponse> {
        self.post("predict/regression", inputs).await
    }

    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        self.get("history").await
    }
}

/// Surface the server's `{error}` message rather than the raw body
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        anyhow::bail!("API error ({}): {}", status, message);
    }

    response.json().await.context("Failed to parse response")
}

// API response types

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub num_features: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsStatus {
    pub classifier: ModelStatus,
    pub regressor: ModelStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub models: ModelsStatus,
    #[serde(default)]
    pub clf_metrics: Map<String, Value>,
    #[serde(default)]
    pub reg_metrics: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub features: Vec<String>,
    pub reg_features: Vec<String>,
    #[serde(default)]
    pub clf_metrics: Map<String, Value>,
    #[serde(default)]
    pub reg_metrics: Map<String, Value>,
    #[serde(default)]
    pub clf_feature_importance: BTreeMap<String, f64>,
    #[serde(default)]
    pub reg_feature_importance: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub prediction: String,
    pub confidence: f64,
    pub prob_confirmed: f64,
    pub prob_false_positive: f64,
    #[serde(default)]
    pub model_metrics: Map<String, Value>,
    #[serde(default)]
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResponse {
    pub prediction_earth_radii: f64,
    pub confidence_interval: [f64; 2],
    pub size_category: String,
    #[serde(default)]
    pub model_metrics: Map<String, Value>,
    #[serde(default)]
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub timestamp: String,
    pub task: String,
    #[serde(default)]
    pub inputs: Value,
    pub result: Value,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}
