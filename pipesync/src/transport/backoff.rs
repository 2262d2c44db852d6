//! Reconnect delays with exponential backoff and jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Jitter applied to backoff delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    #[default]
    Equal,
}

/// Reconnect delay settings.
///
/// The first attempt after a forced reconnect is scheduled waits a fixed,
/// short delay. Consecutive failures then back off exponentially from
/// `base_delay_ms`, capped at `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first attempt, in milliseconds.
    #[serde(default = "default_first_delay_ms")]
    pub first_delay_ms: u64,
    /// Delay after the first failure, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter applied to backed-off delays.
    #[serde(default)]
    pub jitter: JitterStrategy,
}

fn default_first_delay_ms() -> u64 {
    2_000
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            first_delay_ms: default_first_delay_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: JitterStrategy::default(),
        }
    }
}

impl BackoffConfig {
    /// Sets the first-attempt delay.
    #[must_use]
    pub fn with_first_delay_ms(mut self, delay: u64) -> Self {
        self.first_delay_ms = delay;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Consecutive-failure counter producing reconnect delays.
#[derive(Debug, Clone, Default)]
pub struct ReconnectBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ReconnectBackoff {
    /// Creates a backoff at attempt zero.
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Returns the number of delays handed out since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the delay before the next attempt and advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let attempt = self.attempt;
        self.attempt = self.attempt.saturating_add(1);

        if attempt == 0 {
            return Duration::from_millis(self.config.first_delay_ms);
        }

        let exponent = (attempt - 1).min(32);
        let delay = self
            .config
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.config.max_delay_ms);

        let jittered = match self.config.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }

    /// Resets the counter after a successful reconnect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
