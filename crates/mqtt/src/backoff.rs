//! Exponential backoff for connection retry timing.
//!
//! When a connection fails, waiting an increasing amount of time between
//! attempts keeps a recovering broker from being hammered by the client.
//! The delay grows as:
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max_delay)
//! ```
//!
//! There is no attempt limit: connection loss is a recoverable condition,
//! so the schedule saturates at `max_delay` and stays there until the
//! connection succeeds and [`Backoff::reset`] is called.

use std::time::Duration;

/// Retry delay controller with exponential growth and a bounded ceiling.
///
/// Each call to [`next_delay`](Backoff::next_delay) returns the current
/// delay and advances the schedule. A successful connection should call
/// [`reset`](Backoff::reset) so the next failure starts from the initial
/// delay again.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the first retry.
    initial_delay: Duration,

    /// Delay that the next `next_delay` call will return.
    current_delay: Duration,

    /// Ceiling; delays never exceed this.
    max_delay: Duration,

    /// Growth factor applied after each attempt. Clamped to >= 1.0.
    multiplier: f64,

    /// Retries attempted since the last reset.
    attempt: u32,
}

impl Backoff {
    /// Creates a backoff schedule with custom timing.
    ///
    /// # Arguments
    /// - `initial`: delay before the first retry (typically 1-5 seconds)
    /// - `max`: delay ceiling (typically 30-120 seconds)
    /// - `multiplier`: growth factor; values <= 1.0 yield a constant delay
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay: initial,
            current_delay: initial,
            max_delay: max,
            multiplier: multiplier.max(1.0),
            attempt: 0,
        }
    }

    /// Resets the schedule to the initial delay. Call on successful connect.
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempt = 0;
    }

    /// Returns the delay to sleep before the next attempt and advances the
    /// schedule toward the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        let sleep = self.current_delay;

        let next = self.current_delay.as_secs_f64() * self.multiplier;
        self.current_delay = Duration::from_secs_f64(next).min(self.max_delay);

        sleep
    }

    /// Configured delay ceiling.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Retries attempted since the last reset. For logs and diagnostics.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    /// 1 second initial, doubling per attempt, capped at 60 seconds.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_default_creation() {
        let backoff = Backoff::default();
        assert_eq!(backoff.attempt, 0);
        assert_eq!(backoff.current_delay, Duration::from_secs(1));
        assert_eq!(backoff.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_progression() {
        let mut backoff = Backoff::default();

        let delay1 = backoff.next_delay();
        assert_eq!(delay1, Duration::from_secs(1));

        let delay2 = backoff.next_delay();
        assert_eq!(delay2, Duration::from_secs(2));

        let delay3 = backoff.next_delay();
        assert_eq!(delay3, Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_respects_ceiling() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10), 2.0);

        // Run well past saturation; the delay must never exceed the ceiling.
        let mut last = Duration::ZERO;
        for _ in 0..20 {
            last = backoff.next_delay();
            assert!(last <= Duration::from_secs(10));
        }
        assert_eq!(last, Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::default();

        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_degenerate_multiplier_is_constant() {
        let mut backoff = Backoff::new(Duration::from_secs(3), Duration::from_secs(30), 0.5);

        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_never_exhausts() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4), 2.0);

        for _ in 0..1000 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(4));
        }
        assert_eq!(backoff.attempt(), 1000);
    }
}
