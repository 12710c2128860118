//! Connection state tracking for the MQTT session.
//!
//! The state machine replaces callback-based connection-event handling with
//! an observable value: the connection kernel publishes every transition on
//! a watch channel, and any task can inspect or await the current state.

use std::fmt;

/// Current state of the broker session.
///
/// The lifecycle flows `Connecting -> Connected` on a successful handshake,
/// `Connected -> Disconnected` on any transport failure, and
/// `Disconnected -> Reconnecting -> Connecting` through the backoff loop.
/// `Connected` is the only state in which publishing succeeds.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Actively attempting the transport handshake (CONNECT sent, waiting
    /// for CONNACK).
    Connecting,

    /// Session established with active keep-alive. Publishing is possible.
    Connected,

    /// Session lost. The payload is the reason (broker close, network
    /// error, timeout). The kernel schedules a reconnect automatically.
    Disconnected(String),

    /// Waiting out the backoff delay before the next connection attempt.
    /// The payload is the delay in seconds.
    Reconnecting(f64),
}

impl ConnectionState {
    /// Short static identifier, for logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Reconnecting(_) => "Reconnecting",
        }
    }

    /// Contextual details: the disconnect reason or the reconnect delay.
    pub fn details(&self) -> String {
        match self {
            ConnectionState::Connecting | ConnectionState::Connected => String::new(),
            ConnectionState::Disconnected(reason) => reason.clone(),
            ConnectionState::Reconnecting(seconds) => format!("in {seconds} seconds"),
        }
    }

    /// True only in the `Connected` state.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True while a connection attempt is pending or scheduled.
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting(_)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())?;
        let details = self.details();
        if !details.is_empty() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}
