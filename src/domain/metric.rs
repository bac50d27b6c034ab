// Metric domain model - known greenhouse metrics and decoded readings
use serde::{Serialize, Serializer};
use std::fmt;

/// A metric reported by the greenhouse sensor board.
///
/// Variant order is the processing order for fields of a single message;
/// unknown fields sort after every known metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    SoilMoisture,
    Ph,
    Temperature,
    AirHumidity,
    Co2,
    Voc,
    Battery,
    Turbidity,
    WaterQuality,
    Other(String),
}

/// Wire names of the known metrics, in processing order.
pub const KNOWN_METRICS: [(&str, MetricKind); 9] = [
    ("humedad", MetricKind::SoilMoisture),
    ("ph", MetricKind::Ph),
    ("temperatura", MetricKind::Temperature),
    ("humedad_aire", MetricKind::AirHumidity),
    ("co2", MetricKind::Co2),
    ("voc", MetricKind::Voc),
    ("bateria", MetricKind::Battery),
    ("turbidez", MetricKind::Turbidity),
    ("calidad_agua", MetricKind::WaterQuality),
];

impl MetricKind {
    pub fn from_name(name: &str) -> Self {
        KNOWN_METRICS
            .iter()
            .find(|(wire, _)| *wire == name)
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| MetricKind::Other(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            MetricKind::SoilMoisture => "humedad",
            MetricKind::Ph => "ph",
            MetricKind::Temperature => "temperatura",
            MetricKind::AirHumidity => "humedad_aire",
            MetricKind::Co2 => "co2",
            MetricKind::Voc => "voc",
            MetricKind::Battery => "bateria",
            MetricKind::Turbidity => "turbidez",
            MetricKind::WaterQuality => "calidad_agua",
            MetricKind::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MetricKind::Other(_))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for MetricKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(value) => Some(*value),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(value) => write!(f, "{}", value),
            MetricValue::Text(text) => f.write_str(text),
        }
    }
}

/// One decoded measurement, stamped with the sequence of the message it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub metric: MetricKind,
    pub value: MetricValue,
    pub sequence: u64,
}

impl Reading {
    pub fn new(metric: MetricKind, value: MetricValue, sequence: u64) -> Self {
        Self {
            metric,
            value,
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips_known_metrics() {
        for (wire, kind) in KNOWN_METRICS.iter() {
            assert_eq!(&MetricKind::from_name(wire), kind);
            assert_eq!(kind.name(), *wire);
        }
    }

    #[test]
    fn test_unknown_names_become_other() {
        let kind = MetricKind::from_name("luz");
        assert_eq!(kind, MetricKind::Other("luz".to_string()));
        assert!(!kind.is_known());
        assert_eq!(kind.to_string(), "luz");
    }

    #[test]
    fn test_other_sorts_after_known_metrics() {
        let mut kinds = vec![
            MetricKind::Other("aaa".to_string()),
            MetricKind::Ph,
            MetricKind::WaterQuality,
            MetricKind::SoilMoisture,
        ];
        kinds.sort();
        assert_eq!(kinds[0], MetricKind::SoilMoisture);
        assert_eq!(kinds[1], MetricKind::Ph);
        assert_eq!(kinds[3], MetricKind::Other("aaa".to_string()));
    }

    #[test]
    fn test_value_serializes_without_tag() {
        assert_eq!(serde_json::to_string(&MetricValue::Number(4.5)).unwrap(), "4.5");
        assert_eq!(
            serde_json::to_string(&MetricValue::Text("3.7V".to_string())).unwrap(),
            "\"3.7V\""
        );
    }
}
