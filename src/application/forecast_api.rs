// Data access trait for the remote forecasting API
use crate::domain::forecast::ChartPayload;
use crate::infrastructure::envelope::ResponseEnvelope;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Discriminator telling the shared endpoint which query to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Metadata,
    Forecast,
    Spike,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryType::Metadata => "metadata",
            QueryType::Forecast => "forecast",
            QueryType::Spike => "spike",
        };
        f.write_str(name)
    }
}

/// Request body sent for every query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query_type: QueryType,
}

/// Fail-soft access to the forecasting API.
///
/// Every operation reports "no data available" as `None`; configuration,
/// transport and shape errors never reach the caller.
#[async_trait]
pub trait ForecastApi: Send + Sync {
    /// Chart of recent actuals and upcoming forecasts
    async fn fetch_forecast_data(&self) -> Option<ChartPayload>;

    /// Envelope whose `body` holds the JSON-encoded model metadata
    async fn fetch_model_metadata(&self) -> Option<ResponseEnvelope>;

    /// Human-readable notice about an upcoming price spike
    async fn fetch_price_spike_simulation(&self) -> Option<String>;
}
