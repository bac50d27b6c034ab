// Bounded rolling series for charted metrics
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub sequence: u64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(sequence: u64, value: f64) -> Self {
        Self { sequence, value }
    }
}

/// Fixed-capacity FIFO of points; the oldest point is evicted once full.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    capacity: usize,
    points: VecDeque<SeriesPoint>,
}

impl MetricSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn to_vec(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }
}
