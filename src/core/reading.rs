//! The telemetry data model and its canonical wire encoding.
//!
//! A [`Reading`] is one synthesized sample; a [`SignedEnvelope`] is the wire
//! payload: the reading plus an optional integrity tag.
//!
//! # Canonical encoding
//!
//! The signature covers the exact byte sequence of the serialized reading,
//! so the encoding must be reproducible by independent implementations:
//!
//! - JSON, fields in fixed order: `sensor_id`, `metric`, `value`,
//!   `timestamp_ms`, `unit`
//! - `timestamp_ms` is an integer count of milliseconds since the Unix
//!   epoch (no fractional-second formatting ambiguity)
//! - `value` uses serde_json's shortest-round-trip float formatting
//! - no insignificant whitespace
//!
//! A receiver deserializes the envelope, re-serializes the embedded reading
//! under the same rules, and verifies the tag against those bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::signer::Signer;

/// One synthesized sample. Created per tick, consumed immediately, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Identifier of the publishing device.
    pub sensor_id: String,

    /// Metric name from the sensor declaration.
    pub metric: String,

    /// Synthesized value.
    pub value: f64,

    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,

    /// Display unit; may be empty.
    pub unit: String,
}

impl Reading {
    /// The canonical byte encoding this reading is signed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for Reading {
    /// Human-readable one-liner for the console sink.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}={:.3}", self.sensor_id, self.metric, self.value)?;
        if !self.unit.is_empty() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

/// The wire payload: a reading plus an optional integrity tag.
///
/// The `signature` field is omitted entirely in unsigned mode; receivers
/// must treat a missing signature as unauthenticated, never as verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub reading: Reading,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl SignedEnvelope {
    /// Wraps a reading without a signature (explicit unsigned mode).
    pub fn unsigned(reading: Reading) -> Self {
        Self {
            reading,
            signature: None,
        }
    }

    /// Wraps a reading with a tag over its canonical bytes.
    pub fn signed(reading: Reading, signer: &Signer) -> Result<Self, serde_json::Error> {
        let signature = signer.sign(&reading.canonical_bytes()?);
        Ok(Self {
            reading,
            signature: Some(signature),
        })
    }

    /// Serializes the envelope for publishing.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Recomputes the tag over the embedded reading's canonical bytes.
    ///
    /// Returns false when the signature is absent, malformed, or does not
    /// match.
    pub fn verify(&self, signer: &Signer) -> bool {
        let Some(signature) = &self.signature else {
            return false;
        };
        let Ok(body) = self.reading.canonical_bytes() else {
            return false;
        };
        signer.verify(&body, signature)
    }
}
