// HTTP implementation of the forecast API
use crate::application::forecast_api::{ForecastApi, QueryRequest, QueryType};
use crate::domain::forecast::{ChartPayload, ForecastBody};
use crate::infrastructure::config::ApiEndpoints;
use crate::infrastructure::envelope::{decode_body, unwrap_body, ResponseEnvelope};
use crate::infrastructure::error::ApiError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpForecastApi {
    client: reqwest::Client,
    endpoints: ApiEndpoints,
}

impl HttpForecastApi {
    pub fn new(endpoints: ApiEndpoints, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoints,
        })
    }

    /// POST the discriminator and return the raw JSON answer.
    async fn query(&self, query_type: QueryType) -> Result<Value, ApiError> {
        let url = self
            .endpoints
            .url_for(query_type)
            .ok_or(ApiError::MissingEndpoint(query_type))?;

        tracing::debug!("POST {} (queryType={})", url, query_type);
        let response = self
            .client
            .post(url)
            .json(&QueryRequest { query_type })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn forecast(&self) -> Result<ChartPayload, ApiError> {
        let raw = self.query(QueryType::Forecast).await?;
        let body: ForecastBody = decode_body(raw)?;
        Ok(body.into())
    }

    async fn metadata(&self) -> Result<ResponseEnvelope, ApiError> {
        let raw = self.query(QueryType::Metadata).await?;
        ResponseEnvelope::from_raw(raw)
    }

    async fn spike(&self) -> Result<String, ApiError> {
        let raw = self.query(QueryType::Spike).await?;
        Ok(spike_message(unwrap_body(raw)?))
    }
}

fn spike_message(payload: Value) -> String {
    match payload {
        Value::String(message) => message,
        Value::Object(ref fields) => match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => payload.to_string(),
        },
        other => other.to_string(),
    }
}

fn fail_soft<T>(query_type: QueryType, result: Result<T, ApiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("{} query failed: {}", query_type, e);
            None
        }
    }
}

#[async_trait]
impl ForecastApi for HttpForecastApi {
    async fn fetch_forecast_data(&self) -> Option<ChartPayload> {
        fail_soft(QueryType::Forecast, self.forecast().await)
    }

    async fn fetch_model_metadata(&self) -> Option<ResponseEnvelope> {
        fail_soft(QueryType::Metadata, self.metadata().await)
    }

    async fn fetch_price_spike_simulation(&self) -> Option<String> {
        fail_soft(QueryType::Spike, self.spike().await)
    }
}
