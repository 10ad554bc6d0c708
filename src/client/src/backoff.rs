//! Exponential reconnect backoff.
//!
//! Same schedule as gRPC's connection backoff: the first retry waits the
//! base delay, each following one multiplies the previous delay until the
//! cap is reached, and every delay past the first is randomized by the
//! jitter factor.

use std::time::Duration;

use rand::Rng;

use ctrlink_core::BackoffConfig;

/// Delay schedule between dial attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay to wait after `retries` consecutive failed attempts.
    pub fn delay(&self, retries: u32) -> Duration {
        let spread = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_with_spread(retries, spread)
    }

    /// Deterministic form of [`Backoff::delay`]: `spread` in `[-1, 1]`
    /// selects where in the jitter window the delay lands.
    pub fn delay_with_spread(&self, retries: u32, spread: f64) -> Duration {
        let base = self.config.base_delay().as_secs_f64();
        if retries == 0 {
            return self.config.base_delay();
        }

        let max = self.config.max_delay().as_secs_f64();
        let mut backoff = base;
        for _ in 0..retries {
            if backoff >= max {
                break;
            }
            backoff *= self.config.multiplier;
        }
        backoff = backoff.min(max);
        backoff *= 1.0 + self.config.jitter * spread.clamp(-1.0, 1.0);

        Duration::from_secs_f64(backoff.max(0.0))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
