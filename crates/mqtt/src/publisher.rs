//! Connected-gated publishing of telemetry payloads.
//!
//! The `Publisher` hands already-serialized payload bytes to the broker. It
//! deliberately does not serialize anything itself: the application layer
//! signs the exact canonical bytes it publishes, so the transport must not
//! re-encode them.
//!
//! Publishing is valid only while the session is `Connected`. In any other
//! state the call fails fast with [`MqttError::NotConnected`] and the caller
//! drops the reading; telemetry is best-effort, not durable.

use std::time::Duration;

use rumqttc::{AsyncClient, QoS};
use tokio::sync::watch;

use super::{config::MqttConfig, error::MqttError, state::ConnectionState};

/// Thread-safe publishing handle; cheap to clone across metric tasks.
#[derive(Debug, Clone)]
pub struct Publisher {
    /// Client used to enqueue PUBLISH packets.
    client: AsyncClient,

    /// Observed connection state from the kernel.
    state_rx: watch::Receiver<ConnectionState>,

    /// QoS applied to every published reading.
    qos: QoS,

    /// Bound on a single send.
    send_timeout: Duration,
}

impl Publisher {
    /// Creates a publisher from the shared client and the kernel's state
    /// channel.
    pub fn new(
        client: AsyncClient,
        state_rx: watch::Receiver<ConnectionState>,
        config: &MqttConfig,
    ) -> Result<Self, MqttError> {
        Ok(Self {
            client,
            state_rx,
            qos: config.qos_level()?,
            send_timeout: Duration::from_secs(config.send_timeout),
        })
    }

    /// True while the session is in the `Connected` state.
    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_connected()
    }

    /// Publishes payload bytes to a topic.
    ///
    /// # Errors
    ///
    /// - [`MqttError::NotConnected`] if the session is not `Connected`; the
    ///   payload is not queued.
    /// - [`MqttError::SendTimeout`] if the send did not complete within the
    ///   configured bound.
    /// - [`MqttError::Client`] if the client could not enqueue the packet.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }

        match tokio::time::timeout(
            self.send_timeout,
            self.client.publish(topic, self.qos, false, payload),
        )
        .await
        {
            Err(_) => Err(MqttError::SendTimeout(self.send_timeout.as_secs())),
            Ok(result) => result.map_err(MqttError::from),
        }
    }

    /// QoS level applied to published readings.
    pub fn qos(&self) -> QoS {
        self.qos
    }
}
