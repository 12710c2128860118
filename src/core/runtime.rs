//! The sensor runtime: periodic generation, console emission, and
//! best-effort publishing.
//!
//! The runtime spawns one timer task per declared metric, each with its own
//! cadence; a slow publish on one metric never delays another's schedule.
//! Every tick synthesizes a reading, prints its human-readable line to the
//! log sink (always, regardless of broker state), then signs and publishes
//! the envelope. Publish failures are logged and the reading is dropped;
//! telemetry is best-effort, not durable.
//!
//! Shutdown is cooperative: every task selects on the cancellation token
//! around its interval tick, so an interrupt propagates within one
//! suspension point rather than at the next full cycle.

use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::sensor::{MetricSpec, SensorConfig};

use super::{generator::Generator, reading::SignedEnvelope, signer::Signer};

/// Transport seam for the runtime.
///
/// The MQTT publisher implements this; local-only mode uses
/// [`NoopPublisher`]. Payloads arrive fully serialized so the transport
/// cannot perturb the signed bytes.
#[async_trait::async_trait]
pub trait ReadingPublisher: Send + Sync {
    /// Publishes serialized envelope bytes to the given topic.
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Publisher for local-only (stdout) mode: accepts and discards everything.
pub struct NoopPublisher;

#[async_trait::async_trait]
impl ReadingPublisher for NoopPublisher {
    async fn publish(
        &self,
        _topic: &str,
        _payload: Vec<u8>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReadingPublisher for twinsense_mqtt::Publisher {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        twinsense_mqtt::Publisher::publish(self, topic, payload)
            .await
            .map_err(|e| Box::new(e) as _)
    }
}

/// Coordinates Generator → Signer → Publisher on a fixed cadence per metric.
pub struct SensorRuntime {
    config: Arc<SensorConfig>,
    generator: Arc<Generator>,
    signer: Option<Signer>,
    publisher: Arc<dyn ReadingPublisher>,
    cancel: CancellationToken,
}

impl SensorRuntime {
    /// Creates a runtime over an immutable sensor declaration.
    ///
    /// `signer` is `None` in unsigned mode; the caller decides and warns.
    pub fn new(
        config: Arc<SensorConfig>,
        generator: Arc<Generator>,
        signer: Option<Signer>,
        publisher: Arc<dyn ReadingPublisher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            generator,
            signer,
            publisher,
            cancel,
        }
    }

    /// Runs all metric timers until the cancellation token fires.
    pub async fn run(self) {
        info!(
            "Sensor '{}' starting with {} metric(s)",
            self.config.sensor_id,
            self.config.metrics.len()
        );

        let tasks: Vec<_> = self
            .config
            .metrics
            .iter()
            .cloned()
            .map(|spec| {
                let topic = self.config.topic_for(&spec.name);
                let sensor_id = self.config.sensor_id.clone();
                let generator = self.generator.clone();
                let signer = self.signer.clone();
                let publisher = self.publisher.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    metric_loop(spec, topic, sensor_id, generator, signer, publisher, cancel).await;
                })
            })
            .collect();

        for task in tasks {
            let _ = task.await;
        }

        info!("Sensor runtime stopped");
    }
}

/// One metric's periodic loop: tick, generate, log, sign, publish.
async fn metric_loop(
    spec: MetricSpec,
    topic: String,
    sensor_id: String,
    generator: Arc<Generator>,
    signer: Option<Signer>,
    publisher: Arc<dyn ReadingPublisher>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(spec.interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(
        "Metric '{}' scheduled every {}s on topic '{}'",
        spec.name, spec.interval, topic
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Metric '{}' timer stopped", spec.name);
                return;
            }
            _ = ticker.tick() => {
                let reading = generator.generate(&sensor_id, &spec, now_ms());

                // Local observability path: always emitted, even when the
                // broker is unreachable.
                info!("{}", reading);

                let envelope = match &signer {
                    Some(signer) => SignedEnvelope::signed(reading, signer),
                    None => Ok(SignedEnvelope::unsigned(reading)),
                };
                let payload = match envelope.and_then(|e| e.to_payload()) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Failed to encode reading for '{}': {}", spec.name, e);
                        continue;
                    }
                };

                if let Err(e) = publisher.publish(&topic, payload).await {
                    warn!("Publish failed for '{}': {} (reading dropped)", spec.name, e);
                }
            }
        }
    }
}

/// Capture time in milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    (nanos / 1_000_000).max(0) as u64
}
