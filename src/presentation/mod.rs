// Presentation layer - HTTP surface for snapshot consumers
pub mod app_state;
pub mod handlers;
