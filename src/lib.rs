// Greenhouse telemetry - MQTT ingestion, rolling windows and classified snapshots
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
