//! MQTT client construction from configuration.
//!
//! `ClientBuilder` translates a validated [`MqttConfig`] into rumqttc's
//! `AsyncClient` and `EventLoop`. The two must be used together: the client
//! sends commands, the event loop pumps protocol packets and is driven by
//! the connection kernel on its own task.

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use validator::Validate;

use super::{config::MqttConfig, error::MqttError};

/// Builder for the MQTT client and its event loop.
///
/// The returned `AsyncClient` is thread-safe and can be cloned; the
/// `EventLoop` is not and must run on a single task.
pub struct ClientBuilder {
    opts: MqttOptions,
    cap: usize,
}

impl ClientBuilder {
    /// Creates a builder from a configuration struct.
    ///
    /// Validation runs here, so a malformed configuration fails before any
    /// network activity.
    ///
    /// # Errors
    ///
    /// Returns `MqttError::Config` when a field violates its constraints.
    pub fn from_config(config: &MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;

        let mut opts = MqttOptions::new(
            config.effective_client_id(),
            config.host.clone(),
            config.port,
        );
        opts.set_keep_alive(Duration::from_secs(config.keep_alive));
        opts.set_clean_session(config.clean_session);
        opts.set_inflight(config.max_inflight);

        Ok(Self {
            opts,
            cap: config.request_channel_capacity as usize,
        })
    }

    /// Constructs the client and event loop, consuming the builder.
    pub fn build(self) -> (AsyncClient, EventLoop) {
        AsyncClient::new(self.opts, self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_from_config() {
        let config = MqttConfig {
            host: "localhost".into(),
            port: 1883,
            request_channel_capacity: 32,
            ..Default::default()
        };

        let builder = ClientBuilder::from_config(&config).unwrap();
        assert_eq!(builder.cap, 32);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = MqttConfig {
            host: String::new(),
            ..Default::default()
        };

        let result = ClientBuilder::from_config(&config);
        assert!(matches!(result, Err(MqttError::Config(_))));
    }

    #[test]
    fn test_build_returns_client_and_event_loop() {
        let config = MqttConfig::default();
        let builder = ClientBuilder::from_config(&config).unwrap();

        let (client, _event_loop) = builder.build();
        assert!(!format!("{:?}", client).is_empty());
    }
}
