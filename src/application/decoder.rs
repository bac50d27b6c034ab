// Message decoder - turns raw broker payloads into typed readings
use crate::domain::metric::{MetricKind, MetricValue, Reading};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Metrics whose values must be numbers: every windowed metric and every
/// metric with a configured range, whether or not its name is a known one.
#[derive(Debug, Clone, Default)]
pub struct MetricSchema {
    numeric: HashSet<MetricKind>,
}

impl MetricSchema {
    pub fn new(numeric: impl IntoIterator<Item = MetricKind>) -> Self {
        Self {
            numeric: numeric.into_iter().collect(),
        }
    }

    pub fn requires_numeric(&self, metric: &MetricKind) -> bool {
        self.numeric.contains(metric)
    }

    /// Known metrics and configured ones always keep their latest entry.
    pub fn is_tracked(&self, metric: &MetricKind) -> bool {
        metric.is_known() || self.requires_numeric(metric)
    }
}

/// Decode one payload into readings stamped with `sequence`.
///
/// Known metrics come first in their table order, then unknown fields by name.
/// A non-numeric value for a metric the schema requires to be numeric is skipped.
pub fn decode(payload: &[u8], sequence: u64, schema: &MetricSchema) -> Result<Vec<Reading>, DecodeError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(DecodeError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            )));
        }
    };

    let mut readings: Vec<Reading> = fields
        .into_iter()
        .filter_map(|(name, raw)| decode_field(&name, raw, schema))
        .map(|(metric, value)| Reading::new(metric, value, sequence))
        .collect();
    readings.sort_by(|a, b| a.metric.cmp(&b.metric));

    Ok(readings)
}

fn decode_field(name: &str, raw: Value, schema: &MetricSchema) -> Option<(MetricKind, MetricValue)> {
    let metric = MetricKind::from_name(name);

    if schema.requires_numeric(&metric) {
        return match raw.as_f64() {
            Some(number) => Some((metric, MetricValue::Number(number))),
            None => {
                tracing::debug!(metric=%metric, value=%raw, "skipping non-numeric value");
                None
            }
        };
    }

    let value = match raw {
        Value::String(text) => MetricValue::Text(text),
        other => match other.as_f64() {
            Some(number) if metric.is_known() => MetricValue::Number(number),
            _ => MetricValue::Text(other.to_string()),
        },
    };

    Some((metric, value))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
