// Metric window store - bounded series for the metrics that are charted
use crate::domain::metric::MetricKind;
use crate::domain::series::{MetricSeries, SeriesPoint};
use std::collections::HashMap;
use std::sync::RwLock;

pub const DEFAULT_WINDOW_CAPACITY: usize = 30;

/// Holds one [`MetricSeries`] per windowed metric.
///
/// The set of windowed metrics is fixed at construction. Readers get a copy
/// of a series taken under the read lock, so they never see a half-applied append.
#[derive(Debug)]
pub struct MetricWindowStore {
    capacity: usize,
    series: RwLock<HashMap<MetricKind, MetricSeries>>,
}

impl MetricWindowStore {
    pub fn new(windowed: &[MetricKind], capacity: usize) -> Self {
        let series = windowed
            .iter()
            .map(|metric| (metric.clone(), MetricSeries::new(capacity)))
            .collect();

        Self {
            capacity: capacity.max(1),
            series: RwLock::new(series),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a point; returns false if the metric is not windowed.
    pub fn append(&self, metric: &MetricKind, sequence: u64, value: f64) -> bool {
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        match series.get_mut(metric) {
            Some(window) => {
                window.push(SeriesPoint::new(sequence, value));
                true
            }
            None => false,
        }
    }

    pub fn snapshot_series(&self, metric: &MetricKind) -> Option<Vec<SeriesPoint>> {
        self.series
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(metric)
            .map(MetricSeries::to_vec)
    }

    /// Copies of every windowed series, taken under a single read lock.
    pub fn snapshot_all(&self) -> Vec<(MetricKind, Vec<SeriesPoint>)> {
        self.series
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(metric, window)| (metric.clone(), window.to_vec()))
            .collect()
    }
}
