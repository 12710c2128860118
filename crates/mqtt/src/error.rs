//! Error handling for MQTT session and publish operations.
//!
//! `MqttError` aggregates the failure modes of this crate into a single type
//! application code can pattern-match on. The variants fall into two
//! categories:
//!
//! **Startup errors** (abort with a diagnostic):
//! - `Setup`: invalid client configuration
//! - `Config`: validation failures in `MqttConfig`
//!
//! **Runtime errors** (recoverable; log, drop the payload, continue):
//! - `NotConnected`: publish attempted outside the `Connected` state
//! - `SendTimeout`: the send did not complete within the bounded timeout
//! - `Client`: the local client could not queue the packet
//! - `Connection`: a network-level session error

use thiserror::Error;

/// The unified error type for MQTT operations.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Client initialization failed. Caught at startup; fail fast.
    #[error("Client setup error: {0}")]
    Setup(String),

    /// Publish attempted while the session is not in the `Connected` state.
    ///
    /// The payload is not queued. Telemetry is best-effort: callers log the
    /// event and drop the reading; the connection kernel reconnects on its
    /// own schedule.
    #[error("Not connected to broker")]
    NotConnected,

    /// The send did not complete within the configured timeout.
    ///
    /// Keeps a slow or stalled broker from blocking the producer loop.
    #[error("Publish timed out after {0} seconds")]
    SendTimeout(u64),

    /// Configuration validation failed (host length, port range, QoS, ...).
    #[error("Configuration error: {0}")]
    Config(#[from] validator::ValidationErrors),

    /// The local client failed to enqueue a packet (channel full or client
    /// shutting down).
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Network-level connection failure. Boxed to keep the enum small.
    #[error("Connection error: {0}")]
    Connection(#[from] Box<rumqttc::ConnectionError>),
}

impl From<rumqttc::ConnectionError> for MqttError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        MqttError::Connection(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        let err = MqttError::NotConnected;
        assert_eq!(err.to_string(), "Not connected to broker");
    }

    #[test]
    fn test_send_timeout_display() {
        let err = MqttError::SendTimeout(5);
        assert_eq!(err.to_string(), "Publish timed out after 5 seconds");
    }

    #[test]
    fn test_setup_display() {
        let err = MqttError::Setup("bad client id".into());
        assert!(err.to_string().contains("bad client id"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(MqttError::NotConnected);
        assert_eq!(err.to_string(), "Not connected to broker");
    }
}
