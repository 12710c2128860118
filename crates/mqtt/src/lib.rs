//! # twinsense-mqtt: reconnecting MQTT session for telemetry publishing
//!
//! A small, publish-only MQTT layer built on `rumqttc`. It owns the broker
//! session for the lifetime of the process and adds:
//!
//! - **Automatic reconnection** with exponential backoff (bounded ceiling)
//! - **An explicit connection state machine** observable through a watch
//!   channel, instead of ad hoc on-connect/on-disconnect callbacks
//! - **Connected-gated publishing** with a bounded send timeout; a publish
//!   attempted while disconnected fails fast so the caller can drop the
//!   payload and move on
//! - **Cooperative shutdown** through a `CancellationToken`, with a
//!   best-effort DISCONNECT on every exit path
//!
//! # Quick Start
//!
//! ```ignore
//! use twinsense_mqtt::{MqttConfig, MqttManager};
//!
//! let config = MqttConfig {
//!     host: "mqtt.example.com".into(),
//!     port: 1883,
//!     ..Default::default()
//! };
//!
//! let handle = MqttManager::from_config(config)?.build_and_start().await?;
//! let publisher = handle.publisher();
//!
//! publisher.publish("dt/s1/temperature", payload_bytes).await?;
//!
//! handle.shutdown().await;
//! ```
//!
//! # Connection Lifecycle
//!
//! ```text
//! Connecting ──(CONNACK)──> Connected
//!                              │
//!                       (network error)
//!                              │
//!                              ▼
//!                        Disconnected
//!                              │
//!                        (apply backoff)
//!                              │
//!                              ▼
//!                       Reconnecting(secs) ──(delay elapsed)──> Connecting
//! ```
//!
//! Connection errors are never fatal: the kernel retries with an increasing
//! delay up to the configured ceiling, indefinitely, until cancelled.

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod publisher;
pub mod state;

pub use backoff::Backoff;
pub use client::ClientBuilder;
pub use config::MqttConfig;
pub use connection::ConnectionKernel;
pub use error::MqttError;
pub use manager::{MqttHandle, MqttManager};
pub use publisher::Publisher;
pub use state::ConnectionState;

/// Result type for MQTT operations in this crate.
pub type Result<T> = std::result::Result<T, MqttError>;
