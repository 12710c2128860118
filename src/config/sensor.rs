//! Sensor declaration: identity, metric specifications, and transport.
//!
//! A sensor declares an id, a topic template, and one or more metrics, each
//! with its own value distribution and publish cadence. Field constraints
//! are enforced by the `validator` crate; cross-field rules that the derive
//! cannot express (unique metric names) run in [`SensorConfig::validate_schema`].

use serde::{Deserialize, Serialize};
use twinsense_mqtt::MqttConfig;
use validator::{Validate, ValidationError};

use super::ConfigError;

/// How a metric's synthetic values are drawn.
///
/// Declared inline in TOML, e.g.
/// `distribution = { kind = "uniform", min = 15.0, max = 25.0 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Distribution {
    /// Uniform draw in `[min, max]` inclusive. Requires `min < max`.
    Uniform { min: f64, max: f64 },

    /// Normal draw with the given mean and standard deviation. Requires
    /// `stddev > 0`. Values are not clamped.
    Normal { mean: f64, stddev: f64 },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Uniform { min: 0.0, max: 1.0 }
    }
}

/// Validates distribution parameter invariants at config-load time, so
/// value generation itself never fails on a loaded spec.
fn validate_distribution(distribution: &Distribution) -> Result<(), ValidationError> {
    match distribution {
        Distribution::Uniform { min, max } => {
            if !(min < max) || !min.is_finite() || !max.is_finite() {
                let mut err = ValidationError::new("invalid_uniform");
                err.message =
                    Some(format!("Uniform distribution requires min < max, got [{min}, {max}]").into());
                return Err(err);
            }
            Ok(())
        }
        Distribution::Normal { mean, stddev } => {
            if !(*stddev > 0.0) || !mean.is_finite() || !stddev.is_finite() {
                let mut err = ValidationError::new("invalid_normal");
                err.message = Some(
                    format!("Normal distribution requires stddev > 0, got stddev = {stddev}").into(),
                );
                return Err(err);
            }
            Ok(())
        }
    }
}

/// A single metric to synthesize and publish.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricSpec {
    /// Metric name; unique within the sensor declaration.
    #[validate(length(min = 1, message = "Metric name must not be empty"))]
    pub name: String,

    /// Display unit. May be empty.
    pub unit: String,

    /// Value distribution for synthesized readings.
    #[validate(custom(function = "validate_distribution"))]
    pub distribution: Distribution,

    /// Publish period in seconds. Each metric keeps its own cadence.
    #[validate(range(min = 1, message = "Publish interval must be at least 1 second"))]
    pub interval: u64,
}

impl Default for MetricSpec {
    fn default() -> Self {
        Self {
            name: "temperature".into(),
            unit: "C".into(),
            distribution: Distribution::Uniform {
                min: 15.0,
                max: 25.0,
            },
            interval: 5,
        }
    }
}

/// The sensor declaration loaded from the `[sensor]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SensorConfig {
    /// Opaque identifier for the publishing device.
    #[validate(length(min = 1, message = "Sensor id must not be empty"))]
    pub sensor_id: String,

    /// Topic template. `{sensor_id}` and `{metric}` placeholders are
    /// substituted per metric; a template without placeholders gets
    /// `/<sensor_id>/<metric>` appended hierarchically.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Publish base topic must be between 1 and 255 characters"
    ))]
    pub publish_base_topic: String,

    /// Metrics to synthesize. At least one must be declared.
    #[validate(
        length(min = 1, message = "At least one metric must be declared"),
        nested
    )]
    pub metrics: Vec<MetricSpec>,

    /// Optional MQTT transport. Absent means readings go to the console
    /// only, unless environment-derived settings enable publishing.
    #[validate(nested)]
    pub mqtt: Option<MqttConfig>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sensor_id: "twinsense".into(),
            publish_base_topic: "dt/{sensor_id}/{metric}".into(),
            metrics: vec![MetricSpec::default()],
            mqtt: None,
        }
    }
}

impl SensorConfig {
    /// Cross-field rules the field-level derive cannot express.
    pub fn validate_schema(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for spec in &self.metrics {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate metric name: '{}'",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Builds the wire topic for a metric from the configured template.
    pub fn topic_for(&self, metric: &str) -> String {
        let template = &self.publish_base_topic;
        if template.contains("{sensor_id}") || template.contains("{metric}") {
            template
                .replace("{sensor_id}", &self.sensor_id)
                .replace("{metric}", metric)
        } else {
            format!(
                "{}/{}/{}",
                template.trim_end_matches('/'),
                self.sensor_id,
                metric
            )
        }
    }

    /// Declared metric names, in order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SensorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validate_schema().is_ok());
    }

    #[test]
    fn test_duplicate_metric_names_rejected() {
        let config = SensorConfig {
            metrics: vec![
                MetricSpec {
                    name: "temperature".into(),
                    ..Default::default()
                },
                MetricSpec {
                    name: "temperature".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let result = config.validate_schema();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_uniform_requires_min_below_max() {
        let spec = MetricSpec {
            distribution: Distribution::Uniform { min: 5.0, max: 5.0 },
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = MetricSpec {
            distribution: Distribution::Uniform {
                min: 10.0,
                max: 2.0,
            },
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_normal_requires_positive_stddev() {
        let spec = MetricSpec {
            distribution: Distribution::Normal {
                mean: 0.0,
                stddev: 0.0,
            },
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = MetricSpec {
            distribution: Distribution::Normal {
                mean: 0.0,
                stddev: -1.0,
            },
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let spec = MetricSpec {
            distribution: Distribution::Uniform {
                min: f64::NEG_INFINITY,
                max: 0.0,
            },
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = MetricSpec {
            distribution: Distribution::Normal {
                mean: f64::NAN,
                stddev: 1.0,
            },
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_empty_metric_list_rejected() {
        let config = SensorConfig {
            metrics: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_topic_template_substitution() {
        let config = SensorConfig {
            sensor_id: "s1".into(),
            publish_base_topic: "dt/{sensor_id}/{metric}".into(),
            ..Default::default()
        };
        assert_eq!(config.topic_for("temperature"), "dt/s1/temperature");
    }

    #[test]
    fn test_topic_without_placeholders_appends_hierarchy() {
        let config = SensorConfig {
            sensor_id: "s1".into(),
            publish_base_topic: "plant/floor3".into(),
            ..Default::default()
        };
        assert_eq!(config.topic_for("pressure"), "plant/floor3/s1/pressure");

        let config = SensorConfig {
            sensor_id: "s1".into(),
            publish_base_topic: "plant/floor3/".into(),
            ..Default::default()
        };
        assert_eq!(config.topic_for("pressure"), "plant/floor3/s1/pressure");
    }

    #[test]
    fn test_metric_names_preserve_order() {
        let config = SensorConfig {
            metrics: vec![
                MetricSpec {
                    name: "b".into(),
                    ..Default::default()
                },
                MetricSpec {
                    name: "a".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(config.metric_names(), vec!["b", "a"]);
    }
}
