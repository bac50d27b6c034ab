// Snapshot domain model - the immutable state handed to display consumers
use super::metric::{KNOWN_METRICS, MetricKind, MetricValue};
use super::series::SeriesPoint;
use super::threshold::Status;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedValue {
    pub value: MetricValue,
    pub status: Status,
    pub sequence: u64,
}

/// Latest known state of a metric. `Unknown` until the first reading arrives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricEntry {
    Unknown,
    Reported(ClassifiedValue),
}

impl MetricEntry {
    pub fn classified(&self) -> Option<&ClassifiedValue> {
        match self {
            MetricEntry::Unknown => None,
            MetricEntry::Reported(classified) => Some(classified),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub ticks: u64,
    pub elapsed: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<MetricKind, MetricEntry>,
    pub series: BTreeMap<MetricKind, Vec<SeriesPoint>>,
}

impl Snapshot {
    /// Snapshot published before any message is accepted: every known metric unknown.
    pub fn initial(charted: &[MetricKind]) -> Self {
        let metrics = KNOWN_METRICS
            .iter()
            .map(|(_, kind)| (kind.clone(), MetricEntry::Unknown))
            .collect();
        let series = charted.iter().map(|kind| (kind.clone(), Vec::new())).collect();

        Self {
            ticks: 0,
            elapsed: format_elapsed(0),
            updated_at: None,
            metrics,
            series,
        }
    }

    pub fn entry(&self, metric: &MetricKind) -> &MetricEntry {
        self.metrics.get(metric).unwrap_or(&MetricEntry::Unknown)
    }
}

/// Render a tick count as `minutes:seconds`, e.g. 75 -> `1:15`.
pub fn format_elapsed(ticks: u64) -> String {
    format!("{}:{:02}", ticks / 60, ticks % 60)
}
