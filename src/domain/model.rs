// Model metadata domain models
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const MODEL_FAMILY: &str = "XGBoost";

/// Training metadata published alongside the forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: u32,
    pub training_samples: u64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    #[serde(deserialize_with = "string_list_or_encoded")]
    pub feature_columns: Vec<String>,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub training_date: DateTime<Utc>,
    pub training_week: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetric {
    pub key: &'static str,
    pub value: String,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCard {
    pub version: u32,
    pub model_family: &'static str,
    pub metrics: Vec<ModelMetric>,
}

impl ModelMetadata {
    pub fn metrics(&self) -> Vec<ModelMetric> {
        vec![
            ModelMetric {
                key: "Training Samples",
                value: self.training_samples.to_string(),
                description: "Number of samples used for training",
            },
            ModelMetric {
                key: "RMSE",
                value: format!("{:.4}", self.rmse),
                description: "Root Mean Square Error",
            },
            ModelMetric {
                key: "MAE",
                value: format!("{:.4}", self.mae),
                description: "Mean Absolute Error",
            },
            ModelMetric {
                key: "R²",
                value: format!("{:.3}", self.r2),
                description: "Coefficient of determination",
            },
            ModelMetric {
                key: "Training Date",
                value: format_en_au(&self.training_date),
                description: "Timestamp of last training",
            },
            ModelMetric {
                key: "Features",
                value: self.feature_columns.len().to_string(),
                description: "Number of features used in the model",
            },
        ]
    }

    pub fn to_card(&self) -> ModelCard {
        ModelCard {
            version: self.version,
            model_family: MODEL_FAMILY,
            metrics: self.metrics(),
        }
    }
}

/// Australian short date-time, e.g. `05/04/2025, 3:07:09 pm`.
fn format_en_au(ts: &DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y, %-I:%M:%S %P").to_string()
}

// The pipeline stores the column list as a JSON-encoded string
fn string_list_or_encoded<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(list) => Ok(list),
        Raw::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
    }
}

fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognised training date: {text}"))
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
