// Application state for HTTP handlers
use crate::application::ingestion_service::IngestionService;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub ingestion_service: IngestionService,
    pub stream_keep_alive: Duration,
    pub shutdown: watch::Receiver<bool>,
}
