//! MQTT connection configuration.
//!
//! All fields carry validation constraints enforced through the `validator`
//! crate, so an invalid configuration fails at load time with a message
//! naming the offending field rather than at connect time.
//!
//! The `hmac_key` field is the shared secret used by the application layer
//! to sign payloads. It is excluded from serialization and from the `Debug`
//! representation so that key material never reaches a log line or a
//! round-tripped config file.

use std::fmt;

use rumqttc::QoS;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::error::MqttError;

/// Broker connection settings.
///
/// Deserializes from the `[sensor.mqtt]` table of the agent configuration
/// or is assembled from environment-derived settings. Missing fields take
/// the defaults below.
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port. 1883 is plain MQTT.
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Shared secret for payload signing. `None` means payloads are sent
    /// unsigned; the agent logs a warning at startup in that case. Never
    /// serialized or logged.
    #[serde(skip_serializing)]
    pub hmac_key: Option<String>,

    /// Client identifier. An empty string is replaced with a generated UUID
    /// at connect time.
    #[validate(length(max = 36, message = "Client ID must not exceed 36 characters"))]
    pub client_id: String,

    /// Keep-alive interval in seconds.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// Whether to request a clean session from the broker. A telemetry
    /// producer has no subscriptions to preserve, so this defaults to true.
    pub clean_session: bool,

    /// Maximum QoS 1/2 messages in flight simultaneously.
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Max inflight must be between 1 and 1000"
    ))]
    pub max_inflight: u16,

    /// Capacity of the internal request channel; bounds how many publishes
    /// can queue before backpressure.
    #[validate(range(
        min = 1,
        max = 255,
        message = "Request channel capacity must be between 1 and 255"
    ))]
    pub request_channel_capacity: u8,

    /// Quality of service for published readings: 0, 1, or 2.
    #[validate(range(min = 0, max = 2, message = "Invalid QoS value, must be 0, 1, or 2"))]
    pub qos: u8,

    /// Bound on a single publish send, in seconds. A stalled broker must
    /// not block the producer loop.
    #[validate(range(
        min = 1,
        max = 60,
        message = "Send timeout must be between 1 and 60 seconds"
    ))]
    pub send_timeout: u64,

    /// Initial reconnect delay in seconds.
    #[validate(range(
        min = 1,
        max = 60,
        message = "Reconnect initial delay must be between 1 and 60 seconds"
    ))]
    pub reconnect_initial_delay: u64,

    /// Reconnect delay ceiling in seconds.
    #[validate(range(
        min = 1,
        max = 600,
        message = "Reconnect max delay must be between 1 and 600 seconds"
    ))]
    pub reconnect_max_delay: u64,

    /// Exponential growth factor for the reconnect delay.
    #[validate(range(
        min = 1.0,
        max = 30.0,
        message = "Reconnect multiplier must be between 1.0 and 30.0"
    ))]
    pub reconnect_multiplier: f64,
}

impl MqttConfig {
    /// Maps the configured QoS level to the protocol enum.
    pub fn qos_level(&self) -> Result<QoS, MqttError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(MqttError::Setup(format!("Invalid QoS value: {other}"))),
        }
    }

    /// The client id to use at connect time, generating one if unset.
    pub fn effective_client_id(&self) -> String {
        if self.client_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            self.client_id.clone()
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: "localhost".to_string(),
            port: 1883,
            hmac_key: None,
            client_id: String::new(),
            keep_alive: 60,
            clean_session: true,
            max_inflight: 10,
            request_channel_capacity: 10,
            qos: 1,
            send_timeout: 5,
            reconnect_initial_delay: 1,
            reconnect_max_delay: 60,
            reconnect_multiplier: 2.0,
        }
    }
}

// Manual Debug keeps the signing key out of debug-formatted log output.
impl fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "hmac_key",
                &self.hmac_key.as_ref().map(|_| "<redacted>"),
            )
            .field("client_id", &self.client_id)
            .field("keep_alive", &self.keep_alive)
            .field("clean_session", &self.clean_session)
            .field("max_inflight", &self.max_inflight)
            .field("request_channel_capacity", &self.request_channel_capacity)
            .field("qos", &self.qos)
            .field("send_timeout", &self.send_timeout)
            .field("reconnect_initial_delay", &self.reconnect_initial_delay)
            .field("reconnect_max_delay", &self.reconnect_max_delay)
            .field("reconnect_multiplier", &self.reconnect_multiplier)
            .finish()
    }
}
