//! Application configuration loading, validation, and management.
//!
//! This module provides the top-level `Config` structure aggregating the
//! logging and sensor configurations. It handles loading from TOML files,
//! schema validation, and the layering rules for environment-derived
//! settings (see [`auth`]).
//!
//! The configuration is loaded once early in the application lifecycle and
//! remains immutable thereafter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::config::{logger::LoggerConfig, sensor::SensorConfig};

pub mod auth;
pub mod logger;
pub mod sensor;

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur during configuration loading, parsing, or
/// validation. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
///
/// Combines logging and sensor settings into a single structure. The MQTT
/// section lives inside the sensor declaration and may be omitted entirely,
/// in which case environment-derived settings decide whether publishing is
/// enabled (see [`auth::AuthSettings`]).
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Sensor identity, metric declarations, and optional MQTT transport.
    #[validate(nested)]
    pub sensor: SensorConfig,
}

impl Config {
    /// Constructs a new configuration by locating and loading the config file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration file cannot be found,
    /// read, parsed, or validated.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::load(&config_path)
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `TWINSENSE_CONFIG` environment variable
    /// 2. `/etc/twinsense/config.toml`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Config` if no suitable file is found.
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(config_path) = std::env::var("TWINSENSE_CONFIG") {
            let path = PathBuf::from(config_path);
            print_info!("Using config from TWINSENSE_CONFIG: {}", path.display());
            return Ok(path);
        }

        let fallback = Path::new("/etc/twinsense/config.toml");
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(fallback.to_path_buf());
        }

        Err(ConfigError::Config(
            "No configuration file found.".to_string(),
        ))
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(path.to_string_lossy().to_string()));
        }

        let config_str = fs::read_to_string(path)?;
        let config = Self::from_toml(&config_str)?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// Field-level constraints run through `validator`; cross-field schema
    /// rules (unique metric names, distribution invariants) run afterwards.
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        config.sensor.validate_schema()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const EXAMPLE: &str = r#"
        [logger]
        level = "info"

        [sensor]
        sensor_id = "s1"
        publish_base_topic = "dt/{sensor_id}/{metric}"

        [[sensor.metrics]]
        name = "temperature"
        unit = "C"
        interval = 5
        distribution = { kind = "uniform", min = 15.0, max = 25.0 }

        [sensor.mqtt]
        host = "localhost"
        port = 1883
        hmac_key = "k"
    "#;

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(EXAMPLE).unwrap();
        assert_eq!(config.sensor.sensor_id, "s1");
        assert_eq!(config.sensor.metrics.len(), 1);
        assert_eq!(config.sensor.metrics[0].name, "temperature");

        let mqtt = config.sensor.mqtt.unwrap();
        assert_eq!(mqtt.host, "localhost");
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.hmac_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_mqtt_section_is_optional() {
        let config = Config::from_toml(
            r#"
            [sensor]
            sensor_id = "bench"

            [[sensor.metrics]]
            name = "humidity"
            interval = 2
            distribution = { kind = "normal", mean = 40.0, stddev = 3.0 }
            "#,
        )
        .unwrap();
        assert!(config.sensor.mqtt.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sensor.sensor_id, "s1");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::load(Path::new("/nonexistent/twinsense.toml"));
        assert!(matches!(result, Err(ConfigError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = Config::from_toml("[sensor\nsensor_id=");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_empty_sensor_id_rejected() {
        let result = Config::from_toml(
            r#"
            [sensor]
            sensor_id = ""

            [[sensor.metrics]]
            name = "temperature"
            interval = 5
            distribution = { kind = "uniform", min = 0.0, max = 1.0 }
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = Config::from_toml(
            r#"
            [sensor]
            sensor_id = "s1"

            [[sensor.metrics]]
            name = "temperature"
            interval = 0
            distribution = { kind = "uniform", min = 0.0, max = 1.0 }
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
