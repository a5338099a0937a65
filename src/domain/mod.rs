// Domain layer - Forecast and model metadata types
pub mod forecast;
pub mod model;
