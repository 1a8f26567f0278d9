//! Reconnect backoff
//!
//! Exponential backoff with symmetric jitter, capped at the configured
//! maximum. The failure counter is reset when a session reaches `Connected`.

use chat_common::BackoffConfig;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    failures: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        let multiplier = if config.multiplier.is_finite() && config.multiplier >= 1.0 {
            config.multiplier
        } else {
            1.0
        };
        Self {
            config: BackoffConfig {
                multiplier,
                ..config
            },
            failures: 0,
        }
    }

    /// Consecutive failures since the last successful connection
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failure and return how long to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let exponent = i32::try_from(self.failures).unwrap_or(i32::MAX).min(64);
        self.failures = self.failures.saturating_add(1);

        let max = self.config.max.as_secs_f64();
        let base = (self.config.initial.as_secs_f64() * self.config.multiplier.powi(exponent)).min(max);

        let jitter = self.config.jitter.clamp(0.0, 0.99);
        let factor = if jitter > 0.0 {
            1.0 + rand::thread_rng().gen_range(-jitter..=jitter)
        } else {
            1.0
        };

        Duration::from_secs_f64((base * factor).clamp(0.0, max))
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
