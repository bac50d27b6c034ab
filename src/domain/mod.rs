// Domain layer - Greenhouse metrics, thresholds and snapshots
pub mod metric;
pub mod series;
pub mod snapshot;
pub mod threshold;
