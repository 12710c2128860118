//! twinsense — mock telemetry sensor publishing signed readings over MQTT
//!
//! This crate provides a long-running agent that periodically synthesizes
//! metric readings from a declarative configuration and publishes them,
//! authenticated with a keyed MAC, to an MQTT broker. It is designed for
//! long-running operation with graceful shutdown support, resilient broker
//! reconnection, and configurable logging.
//!
//! ## Modules
//!
//! * `config` — Configuration structures, loading, validation, and the
//!   layering rules for environment-derived settings. Supports TOML
//!   configuration files with validation via the `validator` crate.
//!
//! * `core` — Core runtime components:
//!   - Reading data model and canonical wire encoding
//!   - Seedable metric value generator
//!   - Payload signer (BLAKE3 keyed mode)
//!   - Per-metric sensor runtime
//!
//! * `logger` — Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration.
//!
//! The MQTT transport itself (connection state machine, backoff,
//! connected-gated publishing) lives in the `twinsense-mqtt` crate.

pub mod config;
pub mod core;
pub mod logger;
