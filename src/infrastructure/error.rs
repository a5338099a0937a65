// Error taxonomy for the forecast API boundary
use thiserror::Error;

use crate::application::forecast_api::QueryType;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no endpoint configured for {0} queries")]
    MissingEndpoint(QueryType),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint answered with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("envelope reported status {0}")]
    Upstream(i64),

    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}
