// Presentation layer - HTTP routes and server-rendered views
pub mod app_state;
pub mod handlers;
pub mod views;
