//! Synthetic metric value generation.
//!
//! The `Generator` owns the process-wide random source. It is seedable so
//! tests can pin the sequence, and shared behind a mutex so independent
//! metric timers draw from one stream.
//!
//! Generation never fails on a loaded spec: distribution parameter
//! invariants are enforced at config-load time.

use std::sync::{Mutex, MutexGuard};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution as _, Normal};

use crate::config::sensor::{Distribution, MetricSpec};

use super::reading::Reading;

/// Process-wide random source producing [`Reading`]s from metric specs.
pub struct Generator {
    rng: Mutex<StdRng>,
}

impl Generator {
    /// Creates a generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a generator with a fixed seed, for deterministic tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Synthesizes one reading for the given spec at the given capture time.
    pub fn generate(&self, sensor_id: &str, spec: &MetricSpec, timestamp_ms: u64) -> Reading {
        Reading {
            sensor_id: sensor_id.to_string(),
            metric: spec.name.clone(),
            value: self.sample(&spec.distribution),
            timestamp_ms,
            unit: spec.unit.clone(),
        }
    }

    /// Draws one value from the spec's distribution.
    pub fn sample(&self, distribution: &Distribution) -> f64 {
        let mut rng = self.lock_rng();
        match *distribution {
            Distribution::Uniform { min, max } => rng.gen_range(min..=max),
            Distribution::Normal { mean, stddev } => {
                // stddev > 0 is guaranteed by config validation.
                Normal::new(mean, stddev)
                    .map(|normal| normal.sample(&mut *rng))
                    .unwrap_or(mean)
            }
        }
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
