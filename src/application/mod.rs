// Application layer - Data access contract and panel lifecycles
pub mod dashboard_service;
pub mod forecast_api;
pub mod panel;
pub mod simulation;
