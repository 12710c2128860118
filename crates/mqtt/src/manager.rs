//! High-level entry point wiring client, kernel, and publisher together.
//!
//! Applications create an [`MqttManager`] from configuration, call
//! [`build_and_start`](MqttManager::build_and_start), and use the returned
//! [`MqttHandle`] for publishing and shutdown. The actual connection is
//! established asynchronously after the call returns; observe the state
//! channel to know when the session is up.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    backoff::Backoff, client::ClientBuilder, config::MqttConfig, connection::ConnectionKernel,
    error::MqttError, publisher::Publisher, state::ConnectionState,
};

/// Builds the MQTT infrastructure from a validated configuration.
pub struct MqttManager {
    config: MqttConfig,
    cancel: CancellationToken,
}

impl MqttManager {
    /// Creates a manager from an existing configuration.
    ///
    /// # Errors
    ///
    /// Returns `MqttError::Config` when the configuration is invalid.
    pub fn from_config(config: MqttConfig) -> Result<Self, MqttError> {
        // Fail here rather than at connect time; qos_level also re-checks.
        config.qos_level()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Gets a reference to the configuration.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Gets a clone of the cancellation token, usable to trigger shutdown
    /// from anywhere in the application.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Builds the client, spawns the connection kernel, and returns a handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration fails validation; network
    /// failures never surface here, they are handled by the kernel's
    /// reconnect loop.
    pub async fn build_and_start(self) -> Result<MqttHandle, MqttError> {
        info!(
            "Building MQTT session for {}:{}",
            self.config.host, self.config.port
        );

        let (client, event_loop) = ClientBuilder::from_config(&self.config)?.build();

        let backoff = Backoff::new(
            Duration::from_secs(self.config.reconnect_initial_delay),
            Duration::from_secs(self.config.reconnect_max_delay),
            self.config.reconnect_multiplier,
        );
        let kernel = ConnectionKernel::new(
            client.clone(),
            event_loop,
            backoff,
            self.cancel.clone(),
        );
        let state_rx = kernel.state_receiver();
        let publisher = Publisher::new(client, state_rx.clone(), &self.config)?;

        tokio::spawn(kernel.run());

        info!("MQTT session task started");
        Ok(MqttHandle {
            publisher,
            state_rx,
            cancel: self.cancel,
        })
    }
}

/// An active MQTT session, ready for publishing and shutdown.
#[derive(Debug, Clone)]
pub struct MqttHandle {
    publisher: Publisher,
    state_rx: tokio::sync::watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl MqttHandle {
    /// A cloneable publishing handle.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// A receiver observing connection state transitions.
    pub fn state_receiver(&self) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Gets the cancellation token shared with the connection kernel.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests an orderly session close.
    ///
    /// The kernel sends a best-effort DISCONNECT and its task returns. The
    /// call itself only signals; it does not wait for the socket to close.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_from_config() {
        let config = MqttConfig {
            host: "localhost".into(),
            port: 1883,
            ..Default::default()
        };
        let manager = MqttManager::from_config(config).unwrap();
        assert_eq!(manager.config().host, "localhost");
        assert!(!manager.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_build_and_start_returns_handle() {
        let config = MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ..Default::default()
        };
        let manager = MqttManager::from_config(config).unwrap();
        let handle = manager.build_and_start().await.unwrap();

        // No broker is listening; the handle still exists and reports a
        // not-connected state rather than an error.
        assert!(!handle.publisher().is_connected());

        handle.shutdown();
        assert!(handle.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_build() {
        let config = MqttConfig {
            host: String::new(),
            ..Default::default()
        };
        let manager = MqttManager::from_config(config).unwrap();
        let result = manager.build_and_start().await;
        assert!(matches!(result, Err(MqttError::Config(_))));
    }
}
