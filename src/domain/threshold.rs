// Threshold ranges and the classifier that grades readings against them
use super::metric::{MetricKind, MetricValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inclusive `[min, max]` interval a metric should stay within.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Nominal,
    OutOfRange,
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier {
    ranges: HashMap<MetricKind, ThresholdRange>,
}

impl ThresholdClassifier {
    pub fn new(ranges: HashMap<MetricKind, ThresholdRange>) -> Self {
        Self { ranges }
    }

    pub fn range_for(&self, metric: &MetricKind) -> Option<&ThresholdRange> {
        self.ranges.get(metric)
    }

    pub fn ranges(&self) -> &HashMap<MetricKind, ThresholdRange> {
        &self.ranges
    }

    /// Metrics without a configured range are never flagged.
    pub fn classify(&self, metric: &MetricKind, value: f64) -> Status {
        match self.ranges.get(metric) {
            Some(range) if !range.contains(value) => Status::OutOfRange,
            _ => Status::Nominal,
        }
    }

    pub fn classify_value(&self, metric: &MetricKind, value: &MetricValue) -> Status {
        match value.as_f64() {
            Some(number) => self.classify(metric, number),
            None => Status::Nominal,
        }
    }
}
