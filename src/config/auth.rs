//! Environment-derived broker settings and their layering rules.
//!
//! `AuthSettings` resolves the broker hostname, port, and shared signing key
//! from an optional env-style file plus the process environment. Resolution
//! precedence, lowest to highest:
//!
//! 1. built-in default (`localhost:1883`, no key)
//! 2. env-style file value
//! 3. process environment variable
//!
//! An explicit `[sensor.mqtt]` table in the config file outranks all of the
//! above (see [`AuthSettings::merge_into`]).
//!
//! An **empty hostname** is a sentinel meaning "disable MQTT publishing
//! entirely"; the runtime then emits readings to the console only. A missing
//! env file is never an error.

use std::{collections::HashMap, fmt, fs, path::Path};

use tracing::{debug, warn};
use twinsense_mqtt::MqttConfig;

/// Environment variable naming the broker host.
pub const ENV_HOSTNAME: &str = "MQTT_HOSTNAME";
/// Environment variable naming the broker port.
pub const ENV_PORT: &str = "MQTT_PORT";
/// Environment variable carrying the shared signing key.
pub const ENV_HMAC_KEY: &str = "MQTT_HMAC_KEY";

const DEFAULT_HOSTNAME: &str = "localhost";
const DEFAULT_PORT: u16 = 1883;

/// Broker settings resolved from the environment.
#[derive(Clone, Default, PartialEq)]
pub struct AuthSettings {
    /// Broker hostname. `Some("")` is the disable sentinel.
    pub mqtt_hostname: Option<String>,

    /// Broker port.
    pub mqtt_port: Option<u16>,

    /// Shared signing key. Never logged.
    pub mqtt_hmac_key: Option<String>,
}

impl AuthSettings {
    /// Resolves settings from an optional env-style file and the process
    /// environment. Process variables win over file values.
    ///
    /// This never fails: a missing file falls back to the environment, and
    /// malformed lines or values are skipped with a warning.
    pub fn load(env_file: Option<&Path>) -> Self {
        let file_vars = match env_file {
            Some(path) => match fs::read_to_string(path) {
                Ok(content) => parse_env_file(&content),
                Err(e) => {
                    debug!(
                        "Env file {} not loaded ({}); using process environment only",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        let resolve = |key: &str| -> Option<String> {
            std::env::var(key).ok().or_else(|| file_vars.get(key).cloned())
        };

        let mqtt_port = resolve(ENV_PORT).and_then(|raw| match raw.parse::<u16>() {
            Ok(port) if port > 0 => Some(port),
            _ => {
                warn!("Ignoring invalid {} value: '{}'", ENV_PORT, raw);
                None
            }
        });

        Self {
            mqtt_hostname: resolve(ENV_HOSTNAME),
            mqtt_port,
            mqtt_hmac_key: resolve(ENV_HMAC_KEY),
        }
    }

    /// Produces the effective MQTT configuration, merging at most once per
    /// process start.
    ///
    /// An explicit config-file section wins wholesale; only a missing
    /// signing key is filled in from the environment. Without an explicit
    /// section the environment values apply over the built-in defaults, and
    /// the empty-hostname sentinel disables publishing by returning `None`.
    pub fn merge_into(&self, explicit: Option<MqttConfig>) -> Option<MqttConfig> {
        match explicit {
            Some(mut config) => {
                if config.hmac_key.is_none() {
                    config.hmac_key = self.mqtt_hmac_key.clone();
                }
                Some(config)
            }
            None => {
                let host = self
                    .mqtt_hostname
                    .clone()
                    .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
                if host.is_empty() {
                    return None;
                }
                Some(MqttConfig {
                    host,
                    port: self.mqtt_port.unwrap_or(DEFAULT_PORT),
                    hmac_key: self.mqtt_hmac_key.clone(),
                    ..Default::default()
                })
            }
        }
    }
}

// Keeps the signing key out of debug-formatted log output.
impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("mqtt_hostname", &self.mqtt_hostname)
            .field("mqtt_port", &self.mqtt_port)
            .field(
                "mqtt_hmac_key",
                &self.mqtt_hmac_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped, a
/// leading `export ` is tolerated, and matching single or double quotes
/// around the value are stripped.
fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            warn!("Skipping malformed env line: '{}'", line);
            continue;
        };
        let key = key.trim().to_string();
        let mut value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                value = &value[1..value.len() - 1];
                break;
            }
        }
        vars.insert(key, value.to_string());
    }
    vars
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Mutex};

    use tempfile::NamedTempFile;

    use super::*;

    // Process environment is global; serialize the tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        std::env::remove_var(ENV_HOSTNAME);
        std::env::remove_var(ENV_PORT);
        std::env::remove_var(ENV_HMAC_KEY);
    }

    #[test]
    fn test_parse_env_file() {
        let vars = parse_env_file(
            "# broker settings\n\
             MQTT_HOSTNAME=broker.local\n\
             export MQTT_PORT=8883\n\
             MQTT_HMAC_KEY=\"secret key\"\n\
             \n\
             malformed line without equals\n\
             QUOTED='single'\n",
        );
        assert_eq!(vars.get("MQTT_HOSTNAME").unwrap(), "broker.local");
        assert_eq!(vars.get("MQTT_PORT").unwrap(), "8883");
        assert_eq!(vars.get("MQTT_HMAC_KEY").unwrap(), "secret key");
        assert_eq!(vars.get("QUOTED").unwrap(), "single");
        assert_eq!(vars.len(), 4);
    }

    #[test]
    fn test_load_from_file_when_env_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"MQTT_HOSTNAME=broker.local\nMQTT_PORT=2883\nMQTT_HMAC_KEY=k\n")
            .unwrap();

        let auth = AuthSettings::load(Some(file.path()));
        assert_eq!(auth.mqtt_hostname.as_deref(), Some("broker.local"));
        assert_eq!(auth.mqtt_port, Some(2883));
        assert_eq!(auth.mqtt_hmac_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_process_env_wins_over_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_HOSTNAME, "from-env");

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"MQTT_HOSTNAME=from-file\n").unwrap();

        let auth = AuthSettings::load(Some(file.path()));
        assert_eq!(auth.mqtt_hostname.as_deref(), Some("from-env"));

        clear_env();
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let auth = AuthSettings::load(Some(Path::new("/nonexistent/sensor.env")));
        assert_eq!(auth, AuthSettings::default());
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_PORT, "not-a-port");

        let auth = AuthSettings::load(None);
        assert_eq!(auth.mqtt_port, None);

        clear_env();
    }

    #[test]
    fn test_merge_defaults_to_localhost() {
        let auth = AuthSettings::default();
        let config = auth.merge_into(None).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.hmac_key, None);
    }

    #[test]
    fn test_merge_empty_hostname_disables_mqtt() {
        let auth = AuthSettings {
            mqtt_hostname: Some(String::new()),
            ..Default::default()
        };
        assert!(auth.merge_into(None).is_none());
    }

    #[test]
    fn test_merge_env_values_apply() {
        let auth = AuthSettings {
            mqtt_hostname: Some("broker.local".into()),
            mqtt_port: Some(2883),
            mqtt_hmac_key: Some("k".into()),
        };
        let config = auth.merge_into(None).unwrap();
        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 2883);
        assert_eq!(config.hmac_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_merge_explicit_config_wins() {
        let auth = AuthSettings {
            mqtt_hostname: Some("ignored".into()),
            mqtt_port: Some(9999),
            mqtt_hmac_key: Some("env-key".into()),
        };
        let explicit = MqttConfig {
            host: "configured".into(),
            port: 1884,
            hmac_key: Some("file-key".into()),
            ..Default::default()
        };
        let config = auth.merge_into(Some(explicit)).unwrap();
        assert_eq!(config.host, "configured");
        assert_eq!(config.port, 1884);
        assert_eq!(config.hmac_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_merge_fills_missing_key_from_env() {
        let auth = AuthSettings {
            mqtt_hmac_key: Some("env-key".into()),
            ..Default::default()
        };
        let explicit = MqttConfig {
            host: "configured".into(),
            ..Default::default()
        };
        let config = auth.merge_into(Some(explicit)).unwrap();
        assert_eq!(config.hmac_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let auth = AuthSettings {
            mqtt_hmac_key: Some("super-secret".into()),
            ..Default::default()
        };
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("super-secret"));
    }
}
