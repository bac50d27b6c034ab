use crate::application::ingestion_service::DEFAULT_UNLISTED_METRIC_LIMIT;
use crate::application::window_store::DEFAULT_WINDOW_CAPACITY;
use crate::domain::metric::MetricKind;
use crate::domain::threshold::{ThresholdClassifier, ThresholdRange};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("window capacity must be at least 1")]
    ZeroCapacity,
    #[error("threshold range for {metric} is invalid: min={min}, max={max}")]
    InvalidRange { metric: String, min: f64, max: f64 },
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub window: WindowSettings,
    pub http: HttpSettings,
    pub snapshot: SnapshotSettings,
    #[serde(default = "default_thresholds")]
    pub thresholds: HashMap<String, ThresholdRange>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub reconnect_delay_secs: u64,
}

impl MqttSettings {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(5))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowSettings {
    pub capacity: usize,
    pub metrics: Vec<String>,
}

/// Unknown fields that are neither windowed nor range-checked stay in the
/// snapshot only while they are among the most recently reported.
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotSettings {
    pub max_unlisted_metrics: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    pub bind: String,
    pub stream_keep_alive_secs: u64,
}

impl HttpSettings {
    pub fn stream_keep_alive(&self) -> Duration {
        Duration::from_secs(self.stream_keep_alive_secs.max(1))
    }
}

impl Settings {
    pub fn windowed_metrics(&self) -> Vec<MetricKind> {
        let mut metrics: Vec<MetricKind> = self
            .window
            .metrics
            .iter()
            .map(|name| MetricKind::from_name(name.trim()))
            .collect();
        metrics.sort();
        metrics.dedup();
        metrics
    }

    pub fn classifier(&self) -> ThresholdClassifier {
        let ranges = self
            .thresholds
            .iter()
            .map(|(name, range)| (MetricKind::from_name(name), *range))
            .collect();
        ThresholdClassifier::new(ranges)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.window.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (metric, range) in &self.thresholds {
            if !range.is_valid() {
                return Err(ConfigError::InvalidRange {
                    metric: metric.clone(),
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(self)
    }
}

fn default_thresholds() -> HashMap<String, ThresholdRange> {
    HashMap::from([
        ("humedad".to_string(), ThresholdRange::new(20.0, 60.0)),
        ("ph".to_string(), ThresholdRange::new(5.5, 6.5)),
    ])
}

fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(config::Config::builder()
        .set_default("mqtt.host", "broker.hivemq.com")?
        .set_default("mqtt.port", 1883)?
        .set_default("mqtt.topic", "sensor/humedad")?
        .set_default("mqtt.client_id", "greenhouse-telemetry")?
        .set_default("mqtt.keep_alive_secs", 60)?
        .set_default("mqtt.reconnect_delay_secs", 2)?
        .set_default("window.capacity", DEFAULT_WINDOW_CAPACITY as u64)?
        .set_default("window.metrics", vec!["humedad", "ph"])?
        .set_default("http.bind", "0.0.0.0:8080")?
        .set_default("http.stream_keep_alive_secs", 1)?
        .set_default("snapshot.max_unlisted_metrics", DEFAULT_UNLISTED_METRIC_LIMIT as u64)?)
}

/// `GREENHOUSE__SECTION__KEY` variables; `window.metrics` takes a comma separated list.
fn environment() -> config::Environment {
    config::Environment::with_prefix("GREENHOUSE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("window.metrics")
}

/// Layer defaults, the optional `config/greenhouse` file and `GREENHOUSE__*` env vars.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let settings = builder_with_defaults()?
        .add_source(config::File::with_name("config/greenhouse").required(false))
        .add_source(environment())
        .build()?;

    settings.try_deserialize::<Settings>()?.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::threshold::Status;

    fn load_from_toml(toml: &str) -> Result<Settings, ConfigError> {
        let settings = builder_with_defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        settings.try_deserialize::<Settings>()?.validate()
    }

    #[test]
    fn test_defaults_match_greenhouse_setup() {
        let settings = load_from_toml("").unwrap();
        assert_eq!(settings.mqtt.host, "broker.hivemq.com");
        assert_eq!(settings.mqtt.port, 1883);
        assert_eq!(settings.mqtt.topic, "sensor/humedad");
        assert_eq!(settings.window.capacity, 30);
        assert_eq!(settings.snapshot.max_unlisted_metrics, 32);
        assert_eq!(
            settings.windowed_metrics(),
            vec![MetricKind::SoilMoisture, MetricKind::Ph]
        );

        let classifier = settings.classifier();
        assert_eq!(classifier.classify(&MetricKind::Ph, 5.5), Status::Nominal);
        assert_eq!(classifier.classify(&MetricKind::SoilMoisture, 61.0), Status::OutOfRange);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = load_from_toml(
            r#"
            [mqtt]
            host = "localhost"
            topic = "invernadero/+/datos"

            [window]
            capacity = 3
            metrics = ["humedad"]

            [thresholds.temperatura]
            min = 18.0
            max = 28.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.mqtt.host, "localhost");
        assert_eq!(settings.mqtt.port, 1883);
        assert_eq!(settings.window.capacity, 3);
        assert_eq!(settings.windowed_metrics(), vec![MetricKind::SoilMoisture]);

        let classifier = settings.classifier();
        assert_eq!(classifier.classify(&MetricKind::Temperature, 30.0), Status::OutOfRange);
        // An explicit thresholds table replaces the built-in ranges.
        assert_eq!(classifier.classify(&MetricKind::Ph, 9.0), Status::Nominal);
    }

    #[test]
    fn test_shipped_config_file_loads() {
        let settings = builder_with_defaults()
            .unwrap()
            .add_source(config::File::with_name("config/greenhouse"))
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(settings.http.bind, "0.0.0.0:8080");
        assert_eq!(settings.thresholds.len(), 2);
    }

    fn load_from_env(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let settings = builder_with_defaults()?
            .add_source(environment().source(Some(vars)))
            .build()?;
        settings.try_deserialize::<Settings>()?.validate()
    }

    #[test]
    fn test_env_sets_window_metrics_list() {
        let settings = load_from_env(&[
            ("GREENHOUSE__WINDOW__METRICS", "humedad, temperatura"),
            ("GREENHOUSE__WINDOW__CAPACITY", "10"),
            ("GREENHOUSE__SNAPSHOT__MAX_UNLISTED_METRICS", "8"),
        ])
        .unwrap();

        assert_eq!(
            settings.windowed_metrics(),
            vec![MetricKind::SoilMoisture, MetricKind::Temperature]
        );
        assert_eq!(settings.window.capacity, 10);
        assert_eq!(settings.snapshot.max_unlisted_metrics, 8);
    }

    #[test]
    fn test_env_single_window_metric_is_a_list() {
        let settings = load_from_env(&[("GREENHOUSE__WINDOW__METRICS", "ph")]).unwrap();
        assert_eq!(settings.windowed_metrics(), vec![MetricKind::Ph]);
        assert_eq!(settings.mqtt.topic, "sensor/humedad");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = load_from_toml("[window]\ncapacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = load_from_toml("[thresholds.ph]\nmin = 7.0\nmax = 6.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { ref metric, .. } if metric == "ph"));
    }

    #[test]
    fn test_durations_are_clamped() {
        let settings = load_from_toml("[mqtt]\nkeep_alive_secs = 0\nreconnect_delay_secs = 0").unwrap();
        assert_eq!(settings.mqtt.keep_alive(), Duration::from_secs(5));
        assert_eq!(settings.mqtt.reconnect_delay(), Duration::from_secs(1));
    }
}
