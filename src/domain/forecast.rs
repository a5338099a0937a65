// Forecast domain models
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodKind {
    Actual,
    Forecast,
}

impl PeriodKind {
    pub fn label(&self) -> &'static str {
        match self {
            PeriodKind::Actual => "Actual",
            PeriodKind::Forecast => "Forecast",
        }
    }
}

/// A single regional reference price, as stored by the forecasting pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(rename = "RRP", deserialize_with = "number_or_numeric_string")]
    pub value: f64,
    #[serde(rename = "SETTLEMENTDATE")]
    pub timestamp: String,
    #[serde(rename = "PeriodType")]
    pub kind: PeriodKind,
}

impl ForecastPoint {
    pub fn new(value: f64, timestamp: impl Into<String>, kind: PeriodKind) -> Self {
        Self {
            value,
            timestamp: timestamp.into(),
            kind,
        }
    }
}

/// Chart description handed verbatim to Plotly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub data: Vec<Value>,
    #[serde(default = "empty_layout")]
    pub layout: Value,
}

fn empty_layout() -> Value {
    Value::Object(Default::default())
}

impl ChartPayload {
    /// Build a two-trace line chart (actuals and forecasts) from raw points.
    pub fn from_points(mut points: Vec<ForecastPoint>) -> Self {
        // ISO timestamps sort lexicographically
        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let data = [PeriodKind::Actual, PeriodKind::Forecast]
            .into_iter()
            .filter_map(|kind| {
                let (x, y): (Vec<&str>, Vec<f64>) = points
                    .iter()
                    .filter(|p| p.kind == kind)
                    .map(|p| (p.timestamp.as_str(), p.value))
                    .unzip();
                if x.is_empty() {
                    return None;
                }
                let dash = match kind {
                    PeriodKind::Actual => "solid",
                    PeriodKind::Forecast => "dash",
                };
                Some(json!({
                    "type": "scatter",
                    "mode": "lines",
                    "name": kind.label(),
                    "x": x,
                    "y": y,
                    "line": { "dash": dash },
                }))
            })
            .collect();

        let layout = json!({
            "title": { "text": "Electricity Price Forecast" },
            "xaxis": { "title": { "text": "Settlement Date" } },
            "yaxis": { "title": { "text": "RRP ($/MWh)" } },
            "autosize": true,
        });

        Self { data, layout }
    }
}

/// The forecast endpoint serves either a ready chart or the raw points behind it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ForecastBody {
    Chart(ChartPayload),
    Points(Vec<ForecastPoint>),
}

impl From<ForecastBody> for ChartPayload {
    fn from(body: ForecastBody) -> Self {
        match body {
            ForecastBody::Chart(chart) => chart,
            ForecastBody::Points(points) => ChartPayload::from_points(points),
        }
    }
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
