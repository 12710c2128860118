//! Connection lifecycle management with automatic reconnection.
//!
//! The `ConnectionKernel` is the heart of the session: it drives rumqttc's
//! event loop, tracks the connection state machine, applies exponential
//! backoff after failures, and responds to cancellation with a best-effort
//! DISCONNECT.
//!
//! ```text
//! Application
//!     ↓
//! Publisher (uses client, observes state)
//!     ↓
//! ConnectionKernel (runs event loop, manages reconnection)
//!     ↓
//! rumqttc AsyncClient & EventLoop
//!     ↓
//! Network (TCP)
//! ```
//!
//! Connection errors are always treated as recoverable: the kernel sleeps
//! out the backoff delay and lets the event loop retry, indefinitely, until
//! the cancellation token fires. Callers observing the watch channel only
//! ever see `Connected` or one of the not-yet-connected states; there is no
//! terminal error state.

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Packet};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{backoff::Backoff, state::ConnectionState};

/// Drives the MQTT event loop and owns the connection state machine.
///
/// Designed to run on a single tokio task via [`ConnectionKernel::run`].
/// The client can be cloned out beforehand and used from other tasks.
pub struct ConnectionKernel {
    /// Client handle, used for the shutdown DISCONNECT.
    client: AsyncClient,

    /// Event loop receiving protocol packets and errors.
    event_loop: EventLoop,

    /// Retry delay schedule, reset on every successful handshake.
    backoff: Backoff,

    /// Shutdown signal.
    cancel: CancellationToken,

    /// Broadcast side of the state machine.
    state_tx: watch::Sender<ConnectionState>,

    /// Kept so receivers can be handed out before `run` consumes the kernel.
    state_rx: watch::Receiver<ConnectionState>,
}

impl ConnectionKernel {
    /// Creates a kernel in the `Connecting` state.
    pub fn new(
        client: AsyncClient,
        event_loop: EventLoop,
        backoff: Backoff,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        Self {
            client,
            event_loop,
            backoff,
            cancel,
            state_tx,
            state_rx,
        }
    }

    /// Returns a receiver observing connection state transitions.
    ///
    /// The receiver sees the current state immediately on subscription.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Broadcasts a state transition if the state actually changed.
    fn update_state(&self, state: ConnectionState) {
        let changed = *self.state_tx.borrow() != state;
        if changed {
            info!("Connection state changed to: {}", state);
            let _ = self.state_tx.send(state);
        }
    }

    /// Runs the event loop until cancelled.
    ///
    /// On CONNACK the state becomes `Connected` and the backoff resets. On
    /// any event-loop error the state passes through `Disconnected` into
    /// `Reconnecting(delay)`, the delay is slept out (cancellable), and the
    /// loop re-enters `Connecting`. On cancellation a DISCONNECT is sent
    /// best-effort and the task returns.
    pub async fn run(mut self) {
        info!("Starting connection event loop...");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Shutdown signal received, closing MQTT session...");
                    self.disconnect().await;
                    self.update_state(ConnectionState::Disconnected("shutdown".into()));
                    return;
                }

                event_result = self.event_loop.poll() => {
                    match event_result {
                        Ok(event) => self.handle_event(event),
                        Err(e) => {
                            let delay = self.backoff.next_delay();
                            warn!(
                                "Connection error (attempt {}): {}; retrying in {:.1}s",
                                self.backoff.attempt(),
                                root_cause(&e),
                                delay.as_secs_f64()
                            );
                            self.update_state(ConnectionState::Disconnected(e.to_string()));
                            self.update_state(ConnectionState::Reconnecting(delay.as_secs_f64()));

                            tokio::select! {
                                _ = self.cancel.cancelled() => {
                                    info!("Shutdown signal received during backoff");
                                    self.update_state(ConnectionState::Disconnected("shutdown".into()));
                                    return;
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }

                            self.update_state(ConnectionState::Connecting);
                        }
                    }
                }
            }
        }
    }

    /// Updates the state machine from a single protocol event.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(conn_ack)) => {
                if conn_ack.code == ConnectReturnCode::Success {
                    info!("Connection established successfully.");
                    self.backoff.reset();
                    self.update_state(ConnectionState::Connected);
                } else {
                    // Refused CONNACK; the event loop will surface the error
                    // on the next poll and the backoff path takes over.
                    warn!("Broker refused connection: {:?}", conn_ack.code);
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Disconnected by broker");
                self.update_state(ConnectionState::Disconnected(
                    "Disconnected by broker".into(),
                ));
            }
            Event::Incoming(packet) => {
                trace!("Incoming packet: {:?}", packet);
            }
            Event::Outgoing(outgoing) => {
                trace!("Outgoing packet: {:?}", outgoing);
            }
        }
    }

    /// Best-effort DISCONNECT; failure only means the socket closes unclean.
    async fn disconnect(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("Error sending disconnect packet: {:?}", e);
        }
    }
}

/// Walks the error source chain down to the root cause message.
fn root_cause(e: &dyn std::error::Error) -> String {
    let mut current = e;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string().trim_matches('"').to_string()
}
