use std::time::Duration;

use adaptive_backoff::prelude::{
    Backoff, BackoffBuilder, ExponentialBackoff, ExponentialBackoffBuilder,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_INITIAL: Duration = Duration::from_millis(10);
const DEFAULT_FACTOR: f64 = 1.0;
const DEFAULT_JITTER: f64 = 0.1;
const DEFAULT_STEPS: u32 = 5;
/// ceiling used when the policy sets no cap
const DEFAULT_MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq)]
pub enum BackoffError {
    #[error("backoff factor must be a finite, non-negative number, got {0}")]
    InvalidFactor(f64),
    #[error("backoff jitter must be between 0 and 1, got {0}")]
    InvalidJitter(f64),
    #[error("backoff schedule: {0}")]
    Build(String),
}

/// Bounded exponential schedule.
///
/// `steps` is the total number of attempts. Each sleep is
/// `min(initial * factor^n, cap)` plus up to `jitter` of that value at
/// random. Factors below one give a constant schedule, and without a cap the
/// delays stop growing at 30s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackoffPolicy {
    #[serde(with = "humantime_serde")]
    pub initial: Duration,
    pub factor: f64,
    pub jitter: f64,
    pub steps: u32,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub cap: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL,
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
            steps: DEFAULT_STEPS,
            cap: None,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial: Duration, factor: f64, steps: u32) -> Self {
        Self {
            initial,
            factor,
            jitter: 0.0,
            steps,
            cap: None,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = Some(cap);
        self
    }

    /// attempts allowed, never less than one
    pub fn attempts(&self) -> u32 {
        self.steps.max(1)
    }

    pub fn validate(&self) -> Result<(), BackoffError> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(BackoffError::InvalidFactor(self.factor));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(BackoffError::InvalidJitter(self.jitter));
        }
        Ok(())
    }

    /// Unbounded stream of sleeps; the caller counts attempts.
    pub fn delays(&self) -> Result<Delays, BackoffError> {
        self.validate()?;

        let max = self.cap.unwrap_or(DEFAULT_MAX);
        let factor = self.factor.max(1.0);
        let backoff = ExponentialBackoffBuilder::default()
            .factor(factor)
            .min(self.initial.min(max))
            .max(max)
            .build()
            .map_err(|err| BackoffError::Build(err.to_string()))?;

        Ok(Delays {
            backoff,
            factor,
            max,
            jitter: self.jitter,
            last: None,
        })
    }
}

pub struct Delays {
    backoff: ExponentialBackoff,
    factor: f64,
    max: Duration,
    jitter: f64,
    last: Option<Duration>,
}

impl Delays {
    fn base(&mut self) -> Duration {
        // once the next step would pass the ceiling the schedule is flat,
        // so stop driving the exponential counter
        let reached_max = self
            .last
            .is_some_and(|last| last.as_secs_f64() * self.factor >= self.max.as_secs_f64());
        let base = if reached_max {
            self.max
        } else {
            self.backoff.wait().min(self.max)
        };
        self.last = Some(base);
        base
    }
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let base = self.base();
        if self.jitter > 0.0 {
            let extra = base.as_secs_f64() * self.jitter * rand::random::<f64>();
            Some(base.saturating_add(Duration::try_from_secs_f64(extra).unwrap_or_default()))
        } else {
            Some(base)
        }
    }
}
