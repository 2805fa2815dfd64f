use std::time::Duration;

use crate::config::{PollingConfig, ValidationError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;
const MAX_MULTIPLIER: f64 = 10.0;

/// Bounded wait schedule for task status polls.
///
/// The pause before poll `n` (0-based) is `initial_interval * multiplier^n`
/// capped at `max_interval`. A multiplier of `1.0` gives a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            max_attempts,
        }
    }

    pub fn from_config(config: &PollingConfig) -> Result<Self, ValidationError> {
        if config.max_attempts == 0 {
            return Err(ValidationError::new(
                "polling.max_attempts must be a positive integer",
            ));
        }
        if config.interval_secs == 0 {
            return Err(ValidationError::new(
                "polling.interval_secs must be a positive integer",
            ));
        }
        if !config.multiplier.is_finite() || !(1.0..=MAX_MULTIPLIER).contains(&config.multiplier) {
            return Err(ValidationError::new(format!(
                "polling.multiplier must be between 1.0 and {MAX_MULTIPLIER}"
            )));
        }

        let max_interval_secs = config.max_interval_secs.unwrap_or(config.interval_secs);
        if max_interval_secs < config.interval_secs {
            return Err(ValidationError::new(
                "polling.max_interval_secs cannot be smaller than polling.interval_secs",
            ));
        }

        Ok(Self {
            initial_interval: Duration::from_secs(config.interval_secs),
            max_interval: Duration::from_secs(max_interval_secs),
            multiplier: config.multiplier,
            max_attempts: config.max_attempts,
        })
    }

    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(scaled)
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(|attempt| self.delay_before_attempt(attempt))
    }

    /// Total time spent pausing when every poll is used.
    pub fn total_budget(&self) -> Duration {
        self.delays().sum()
    }
}
