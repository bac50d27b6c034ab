// Application layer - Use cases over the greenhouse domain
pub mod decoder;
pub mod ingestion_service;
pub mod telemetry_source;
pub mod window_store;
