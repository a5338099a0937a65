// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod envelope;
pub mod error;
pub mod http_forecast_api;
