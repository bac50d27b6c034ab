// Ingestion service - Use case for turning broker payloads into published snapshots
use crate::application::decoder::{DecodeError, MetricSchema, decode};
use crate::application::window_store::MetricWindowStore;
use crate::domain::metric::MetricKind;
use crate::domain::series::SeriesPoint;
use crate::domain::snapshot::{ClassifiedValue, MetricEntry, Snapshot, format_elapsed};
use crate::domain::threshold::ThresholdClassifier;
use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

/// How many unlisted metric names the snapshot keeps before evicting the stalest.
pub const DEFAULT_UNLISTED_METRIC_LIMIT: usize = 32;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Tick counter and latest metric entries; only touched under the cursor lock.
#[derive(Debug)]
struct IngestCursor {
    ticks: u64,
    metrics: BTreeMap<MetricKind, MetricEntry>,
    // Unlisted metrics, least recently reported first
    unlisted: VecDeque<MetricKind>,
}

impl IngestCursor {
    /// Store the latest entry for `metric`.
    ///
    /// Untracked metrics are bounded by `limit`; reporting one that would go
    /// over it drops the unlisted metric that has gone longest without a reading.
    fn record(&mut self, metric: MetricKind, entry: MetricEntry, tracked: bool, limit: usize) {
        if !tracked {
            if limit == 0 {
                return;
            }
            if let Some(position) = self.unlisted.iter().position(|m| *m == metric) {
                self.unlisted.remove(position);
            } else if self.unlisted.len() >= limit {
                if let Some(evicted) = self.unlisted.pop_front() {
                    tracing::debug!(metric=%evicted, "evicting stale unlisted metric");
                    self.metrics.remove(&evicted);
                }
            }
            self.unlisted.push_back(metric.clone());
        }
        self.metrics.insert(metric, entry);
    }
}

/// Everything the pipeline owns, built once at startup and shared by handle.
#[derive(Debug)]
pub struct PipelineState {
    schema: MetricSchema,
    window_store: MetricWindowStore,
    classifier: ThresholdClassifier,
    unlisted_limit: usize,
    cursor: Mutex<IngestCursor>,
    publisher: watch::Sender<Arc<Snapshot>>,
}

impl PipelineState {
    pub fn new(windowed: &[MetricKind], capacity: usize, classifier: ThresholdClassifier) -> Self {
        let initial = Snapshot::initial(windowed);
        let cursor = IngestCursor {
            ticks: initial.ticks,
            metrics: initial.metrics.clone(),
            unlisted: VecDeque::new(),
        };
        let (publisher, _) = watch::channel(Arc::new(initial));

        // Windowed and range-checked metrics only ever take numbers.
        let schema = MetricSchema::new(
            windowed
                .iter()
                .chain(classifier.ranges().keys())
                .cloned(),
        );

        Self {
            schema,
            window_store: MetricWindowStore::new(windowed, capacity),
            classifier,
            unlisted_limit: DEFAULT_UNLISTED_METRIC_LIMIT,
            cursor: Mutex::new(cursor),
            publisher,
        }
    }

    pub fn with_unlisted_limit(mut self, limit: usize) -> Self {
        self.unlisted_limit = limit;
        self
    }
}

#[derive(Clone)]
pub struct IngestionService {
    state: Arc<PipelineState>,
}

impl IngestionService {
    pub fn new(state: Arc<PipelineState>) -> Self {
        Self { state }
    }

    /// Process one inbound message and publish the resulting snapshot.
    ///
    /// The tick for this message is reserved up front and only committed once
    /// the payload decodes, so a rejected message leaves all state untouched.
    pub fn ingest(&self, payload: &[u8]) -> Result<Arc<Snapshot>, IngestError> {
        let state = &self.state;
        let mut cursor = state.cursor.lock().unwrap_or_else(|e| e.into_inner());

        let sequence = cursor.ticks + 1;
        let readings = decode(payload, sequence, &state.schema)?;
        cursor.ticks = sequence;

        for reading in readings {
            if let Some(value) = reading.value.as_f64() {
                state.window_store.append(&reading.metric, sequence, value);
            }

            let status = state.classifier.classify_value(&reading.metric, &reading.value);
            tracing::trace!(metric=%reading.metric, value=%reading.value, ?status, sequence, "classified reading");
            let tracked = state.schema.is_tracked(&reading.metric);
            cursor.record(
                reading.metric,
                MetricEntry::Reported(ClassifiedValue {
                    value: reading.value,
                    status,
                    sequence,
                }),
                tracked,
                state.unlisted_limit,
            );
        }

        let snapshot = Arc::new(Snapshot {
            ticks: cursor.ticks,
            elapsed: format_elapsed(cursor.ticks),
            updated_at: Some(Utc::now()),
            metrics: cursor.metrics.clone(),
            series: state.window_store.snapshot_all().into_iter().collect(),
        });

        // Replace-latest: never waits on receivers, and works with none attached.
        state.publisher.send_replace(snapshot.clone());

        Ok(snapshot)
    }

    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        self.state.publisher.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.state.publisher.subscribe()
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.state
            .cursor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ticks
    }

    pub fn series(&self, metric: &MetricKind) -> Option<Vec<SeriesPoint>> {
        self.state.window_store.snapshot_series(metric)
    }

    pub fn window_capacity(&self) -> usize {
        self.state.window_store.capacity()
    }

    pub fn classifier(&self) -> &ThresholdClassifier {
        &self.state.classifier
    }
}
