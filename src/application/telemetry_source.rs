// Source trait for inbound telemetry and the loop that feeds the ingestion service
use crate::application::ingestion_service::IngestionService;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

/// One raw message as delivered by the broker.
#[derive(Debug, Clone)]
pub struct InboundPayload {
    pub topic: String,
    pub payload: Bytes,
}

impl InboundPayload {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[async_trait]
pub trait TelemetrySource: Send {
    /// Wait for the next payload. `Ok(None)` means the source is exhausted.
    async fn next_payload(&mut self) -> anyhow::Result<Option<InboundPayload>>;

    /// Human readable origin, used in log lines
    fn describe(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: u64,
    pub rejected: u64,
}

/// Pump payloads from `source` into `service` until the source ends or
/// `shutdown` flips to true.
pub async fn run_ingest_loop<S: TelemetrySource>(
    mut source: S,
    service: IngestionService,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    tracing::info!(source=%source.describe(), "ingest loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            next = source.next_payload() => next?,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        let Some(message) = next else {
            tracing::info!(source=%source.describe(), "telemetry source exhausted");
            break;
        };

        match service.ingest(&message.payload) {
            Ok(snapshot) => {
                summary.accepted += 1;
                tracing::debug!(topic=%message.topic, ticks=snapshot.ticks, "accepted telemetry");
            }
            Err(err) => {
                summary.rejected += 1;
                tracing::warn!(error=%err, topic=%message.topic, "dropping telemetry payload");
            }
        }
    }

    tracing::info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        ticks = service.elapsed_ticks(),
        "ingest loop stopped"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingestion_service::PipelineState;
    use crate::domain::metric::MetricKind;
    use crate::domain::threshold::ThresholdClassifier;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct QueueSource {
        messages: VecDeque<InboundPayload>,
    }

    #[async_trait]
    impl TelemetrySource for QueueSource {
        async fn next_payload(&mut self) -> anyhow::Result<Option<InboundPayload>> {
            Ok(self.messages.pop_front())
        }

        fn describe(&self) -> String {
            "queue".to_string()
        }
    }

    struct ChannelSource {
        rx: mpsc::Receiver<InboundPayload>,
    }

    #[async_trait]
    impl TelemetrySource for ChannelSource {
        async fn next_payload(&mut self) -> anyhow::Result<Option<InboundPayload>> {
            Ok(self.rx.recv().await)
        }

        fn describe(&self) -> String {
            "channel".to_string()
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TelemetrySource for FailingSource {
        async fn next_payload(&mut self) -> anyhow::Result<Option<InboundPayload>> {
            anyhow::bail!("broker gone")
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn service() -> IngestionService {
        let state = PipelineState::new(&[MetricKind::SoilMoisture], 30, ThresholdClassifier::default());
        IngestionService::new(Arc::new(state))
    }

    #[tokio::test]
    async fn test_loop_counts_accepted_and_rejected() {
        let source = QueueSource {
            messages: VecDeque::from(vec![
                InboundPayload::new("sensor/humedad", &br#"{"humedad": 41}"#[..]),
                InboundPayload::new("sensor/humedad", &b"not json"[..]),
                InboundPayload::new("sensor/humedad", &br#"{"humedad": 42}"#[..]),
            ]),
        };
        let service = service();
        let (_tx, rx) = watch::channel(false);

        let summary = run_ingest_loop(source, service.clone(), rx).await.unwrap();

        assert_eq!(summary, IngestSummary { accepted: 2, rejected: 1 });
        assert_eq!(service.elapsed_ticks(), 2);
        assert_eq!(service.series(&MetricKind::SoilMoisture).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_a_waiting_loop() {
        let (payload_tx, payload_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let service = service();

        let handle = tokio::spawn(run_ingest_loop(
            ChannelSource { rx: payload_rx },
            service.clone(),
            shutdown_rx,
        ));

        payload_tx
            .send(InboundPayload::new("sensor/humedad", &br#"{"humedad": 30}"#[..]))
            .await
            .unwrap();
        while service.elapsed_ticks() == 0 {
            tokio::task::yield_now().await;
        }

        shutdown_tx.send(true).unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.accepted, 1);
        drop(payload_tx);
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let (_tx, rx) = watch::channel(false);
        let err = run_ingest_loop(FailingSource, service(), rx).await.unwrap_err();
        assert_eq!(err.to_string(), "broker gone");
    }
}
