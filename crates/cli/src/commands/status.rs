//! Service status commands: health and model metadata

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, ModelStatus};
use crate::output::{
    color_status, metric_rows, print_info, print_json, print_table, top_features, FieldRow,
    OutputFormat,
};

/// Row for the models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Features")]
    num_features: usize,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "SHA-256")]
    sha256: String,
}

impl ModelRow {
    fn new(model: &str, status: &ModelStatus) -> Self {
        Self {
            model: model.to_string(),
            num_features: status.num_features,
            path: status.path.clone().unwrap_or_else(|| "-".to_string()),
            sha256: status
                .sha256
                .as_deref()
                .map(short_digest)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Row for the feature table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Classifier")]
    classifier: String,
    #[tabled(rename = "Regressor")]
    regressor: String,
}

fn short_digest(digest: &str) -> String {
    digest.chars().take(12).collect()
}

/// Show service health, loaded models and their metrics
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    if format == OutputFormat::Json {
        return print_json(&health);
    }

    println!("Status: {}", color_status(&health.status));
    println!();
    print_table(&[
        ModelRow::new("classifier", &health.models.classifier),
        ModelRow::new("regressor", &health.models.regressor),
    ]);

    let mut rows = metric_rows("classifier", &health.clf_metrics);
    rows.extend(metric_rows("regressor", &health.reg_metrics));
    if !rows.is_empty() {
        println!();
        print_table(&rows);
    }

    Ok(())
}

/// Show feature lists, metrics and top feature importances
pub async fn show_metadata(client: &ApiClient, top: usize, format: OutputFormat) -> Result<()> {
    let metadata = client.metadata().await?;

    if format == OutputFormat::Json {
        return print_json(&metadata);
    }

    let mut names: Vec<&String> = metadata.features.iter().collect();
    for name in &metadata.reg_features {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let features: Vec<FeatureRow> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| FeatureRow {
            index: i + 1,
            name: name.clone(),
            classifier: mark(metadata.features.contains(name)),
            regressor: mark(metadata.reg_features.contains(name)),
        })
        .collect();
    print_table(&features);

    for (model, importance) in [
        ("classifier", &metadata.clf_feature_importance),
        ("regressor", &metadata.reg_feature_importance),
    ] {
        let ranked = top_features(importance, top);
        if ranked.is_empty() {
            continue;
        }
        println!();
        print_info(&format!("Top {} features for the {}", ranked.len(), model));
        let rows: Vec<FieldRow> = ranked
            .into_iter()
            .map(|(name, weight)| FieldRow::new(name, format!("{:.4}", weight)))
            .collect();
        print_table(&rows);
    }

    let mut rows = metric_rows("classifier", &metadata.clf_metrics);
    rows.extend(metric_rows("regressor", &metadata.reg_metrics));
    if !rows.is_empty() {
        println!();
        print_table(&rows);
    }

    Ok(())
}

fn mark(present: bool) -> String {
    let mark = if present { "yes" } else { "-" };
    mark.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_row_shortens_digest() {
        let row = ModelRow::new(
            "classifier",
            &ModelStatus {
                num_features: 23,
                path: None,
                sha256: Some("0123456789abcdef0123".to_string()),
            },
        );
        assert_eq!(row.sha256, "0123456789ab");
        assert_eq!(row.path, "-");
    }
}
