//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use exoscope_lib::{
    predictor::{Classifier, Regressor},
    ClassProbabilities, FeatureVector, Metadata, PredictionLog, PredictionService, Result,
};
use exoscope_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Reads P(CONFIRMED) from `koi_score`
struct ScoreClassifier;

impl Classifier for ScoreClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities> {
        let score = features.values()[0];
        Ok(ClassProbabilities {
            false_positive: 1.0 - score,
            confirmed: score,
        })
    }
}

/// Reads log1p(radius) from `koi_depth`
struct DepthRegressor;

impl Regressor for DepthRegressor {
    fn predict_log_radius(&self, features: &FeatureVector) -> Result<f64> {
        Ok(features.values()[0])
    }
}

fn test_metadata() -> Metadata {
    serde_json::from_value(json!({
        "features": ["koi_score", "koi_period"],
        "reg_features": ["koi_depth", "koi_period"],
        "clf_metrics": {"f1": 0.91, "roc_auc": 0.97},
        "reg_metrics": {"rmse": 1.82, "mae": 0.64},
        "clf_feature_importance": {"koi_score": 0.8, "koi_period": 0.2},
        "reg_feature_importance": {"koi_depth": 0.9, "koi_period": 0.1},
        "trained_on": "cumulative_2025"
    }))
    .unwrap()
}

fn setup_test_app_with_log(log: PredictionLog) -> Router {
    let service = PredictionService::new(
        test_metadata(),
        Arc::new(ScoreClassifier),
        Arc::new(DepthRegressor),
        log,
    );
    create_router(Arc::new(AppState::new(service)))
}

fn setup_test_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let log = PredictionLog::new(dir.path().join("predictions.db"));
    log.init().unwrap();
    (dir, setup_test_app_with_log(log))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_root_returns_banner() {
    let (_dir, app) = setup_test_app();
    let (status, body) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ExoScope Backend Running");
}

#[tokio::test]
async fn test_health_reports_models_and_metrics() {
    let (_dir, app) = setup_test_app();
    let (status, health) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["models"]["classifier"]["num_features"], 2);
    assert_eq!(health["models"]["regressor"]["num_features"], 2);
    assert_eq!(health["clf_metrics"]["roc_auc"], 0.97);
    assert_eq!(health["reg_metrics"]["mae"], 0.64);
}

#[tokio::test]
async fn test_metadata_returns_full_document() {
    let (_dir, app) = setup_test_app();
    let (status, metadata) = get_json(&app, "/metadata").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(metadata["features"], json!(["koi_score", "koi_period"]));
    assert_eq!(metadata["reg_feature_importance"]["koi_depth"], 0.9);
    assert_eq!(metadata["trained_on"], "cumulative_2025");
}

#[tokio::test]
async fn test_classification_returns_result_with_latency() {
    let (_dir, app) = setup_test_app();
    let (status, result) = post(
        &app,
        "/predict/classification",
        r#"{"koi_score": 0.73, "koi_period": null}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["prediction"], "CONFIRMED");
    assert_eq!(result["confidence"], 0.73);
    assert_eq!(result["prob_confirmed"], 0.73);
    assert_eq!(result["prob_false_positive"], 0.27);
    assert_eq!(result["model_metrics"]["f1"], 0.91);
    assert_eq!(result["feature_importance"]["koi_score"], 0.8);
    assert!(result["latency_ms"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_classification_ignores_content_type() {
    let (_dir, app) = setup_test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict/classification")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(r#"{"koi_score": "0.2"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let result: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["prediction"], "FALSE POSITIVE");
    assert_eq!(result["confidence"], 0.8);
}

#[tokio::test]
async fn test_regression_clamps_to_minimum_radius() {
    let (_dir, app) = setup_test_app();
    let (status, result) = post(&app, "/predict/regression", r#"{"koi_depth": 0.0}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["prediction_earth_radii"], 0.01);
    assert_eq!(result["confidence_interval"], json!([0.01, 0.0115]));
    assert_eq!(result["size_category"], "Sub-Earth");
    assert_eq!(result["model_metrics"]["rmse"], 1.82);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (_dir, app) = setup_test_app();
    let (status, error) = post(&app, "/predict/classification", "{koi_score: ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().unwrap().contains("not valid JSON"));
    assert!(error["trace"].is_array());
}

#[tokio::test]
async fn test_non_numeric_feature_is_bad_request() {
    let (_dir, app) = setup_test_app();
    let (status, error) = post(
        &app,
        "/predict/regression",
        r#"{"koi_depth": 1.0, "koi_period": "long"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().unwrap().contains("koi_period"));

    let (_, history) = get_json(&app, "/history").await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_history_is_newest_first_with_inputs() {
    let (_dir, app) = setup_test_app();
    let (_, first) = post(&app, "/predict/classification", r#"{"koi_score": 0.9}"#).await;
    let (_, second) = post(&app, "/predict/regression", r#"{"koi_depth": 1.0}"#).await;

    let (status, history) = get_json(&app, "/history").await;
    assert_eq!(status, StatusCode::OK);

    let records = history.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["task"], "regression");
    assert_eq!(records[1]["task"], "classification");
    assert!(records[0]["id"].as_i64().unwrap() > records[1]["id"].as_i64().unwrap());
    assert_eq!(records[0]["inputs"], json!({"koi_depth": 1.0}));
    assert!(records[0]["timestamp"].is_string());

    // Logged results equal the returned ones minus latency_ms
    for (record, returned) in [(&records[0], second), (&records[1], first)] {
        let mut expected = returned.clone();
        let latency = expected.as_object_mut().unwrap().remove("latency_ms").unwrap();
        assert_eq!(record["result"], expected);
        assert_eq!(record["latency_ms"], latency);
    }
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let dir = TempDir::new().unwrap();
    let log = PredictionLog::new(dir.path().join("missing").join("predictions.db"));
    let app = setup_test_app_with_log(log);

    let (status, error) = post(&app, "/predict/regression", r#"{"koi_depth": 1.0}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error["error"].as_str().unwrap().contains("prediction log"));

    let (status, _) = get_json(&app, "/history").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_dir, app) = setup_test_app();
    post(&app, "/predict/classification", r#"{"koi_score": 0.9}"#).await;

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let body = String::from_utf8(body).unwrap();
    assert!(body.contains("exoscope_predictions_total"));
    assert!(body.contains("exoscope_prediction_latency_seconds"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (_dir, app) = setup_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (_dir, app) = setup_test_app();
    let (status, _) = get(&app, "/predict").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
