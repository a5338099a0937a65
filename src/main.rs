// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::forecast_api::ForecastApi;
use crate::infrastructure::config::load_config;
use crate::infrastructure::http_forecast_api::HttpForecastApi;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_config()?;
    let endpoints = config.api.endpoints();
    for query in endpoints.missing() {
        tracing::warn!("no endpoint configured for {} queries, they will show as empty", query);
    }

    // Create API client (infrastructure layer)
    let api: Arc<dyn ForecastApi> =
        Arc::new(HttpForecastApi::new(endpoints, config.api.request_timeout())?);

    // Dashboard service; each page view mounts its own panels (application layer)
    let dashboard = DashboardService::new(api, config.panels.clone());
    let state = Arc::new(AppState { dashboard });

    // Build router (presentation layer)
    let app = router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting price forecast dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
