// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reactivation policy.
//!
//! Decides, after each failed recovery attempt, whether the session state
//! machine schedules another attempt (and how long it waits first) or gives
//! up and resolves the pending notification with a terminal failure.
//!
//! The budget is bounded by default. An unbounded budget (`max_attempts:
//! None` and `max_elapsed: None`) must be requested explicitly.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};

// =============================================================================
// BackoffStrategy
// =============================================================================

/// How the delay grows between reactivation attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Fixed,

    /// Delay grows by `initial_delay` per retry.
    Linear,

    /// Delay is multiplied by `multiplier` per retry.
    #[default]
    Exponential,
}

impl BackoffStrategy {
    /// Raw (uncapped) delay in seconds before retry number `retry` (1-based).
    fn delay_secs(&self, initial: Duration, multiplier: f64, retry: u32) -> f64 {
        let base = initial.as_secs_f64();
        let step = retry.saturating_sub(1);
        match self {
            Self::Fixed => base,
            Self::Linear => base * f64::from(step + 1),
            Self::Exponential => base * multiplier.powi(step.min(i32::MAX as u32) as i32),
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "Fixed"),
            Self::Linear => write!(f, "Linear"),
            Self::Exponential => write!(f, "Exponential"),
        }
    }
}

// =============================================================================
// RetryDecision
// =============================================================================

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another attempt.
    Retry {
        /// Number of the next retry (1-based).
        retry: u32,
        /// Delay before the retry starts.
        delay: Duration,
    },

    /// Stop recovering.
    GiveUp {
        /// Attempts made in total.
        attempts: u32,
        /// Why the policy stopped.
        reason: GiveUpReason,
    },
}

impl RetryDecision {
    /// Returns `true` if another attempt will be made.
    #[inline]
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

/// Why reactivation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// `max_attempts` reached.
    AttemptsExhausted,
    /// `max_elapsed` exceeded.
    DeadlineExceeded,
    /// The error can never succeed on retry.
    FatalError,
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptsExhausted => write!(f, "attempts exhausted"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::FatalError => write!(f, "fatal error"),
        }
    }
}

// =============================================================================
// ReactivationPolicy
// =============================================================================

/// Retry budget and backoff schedule for session reactivation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tether_opcua::client::{BackoffStrategy, ReactivationPolicy};
///
/// let policy = ReactivationPolicy::default()
///     .with_max_attempts(5)
///     .with_initial_delay(Duration::from_millis(200))
///     .with_strategy(BackoffStrategy::Exponential);
///
/// assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
/// assert_eq!(policy.delay_for_retry(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationPolicy {
    /// Total attempts allowed per reactivation. `None` means unbounded.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,

    /// Wall-clock budget for one reactivation. `None` means unbounded.
    #[serde(default, with = "humantime_serde")]
    pub max_elapsed: Option<Duration>,

    /// Delay before the first retry.
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Growth factor for exponential backoff.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Delay growth strategy.
    #[serde(default)]
    pub strategy: BackoffStrategy,

    /// Stop immediately on errors that are not retryable.
    #[serde(default = "default_give_up_on_fatal")]
    pub give_up_on_fatal: bool,
}

fn default_max_attempts() -> Option<u32> {
    Some(10)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_give_up_on_fatal() -> bool {
    true
}

impl Default for ReactivationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_elapsed: None,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            strategy: BackoffStrategy::default(),
            give_up_on_fatal: default_give_up_on_fatal(),
        }
    }
}

impl ReactivationPolicy {
    /// Creates a policy allowing `max_attempts` attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Default::default()
        }
    }

    /// Retries forever. Callers waiting on a reactivating session may
    /// wait indefinitely.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            max_elapsed: None,
            ..Default::default()
        }
    }

    /// Sets the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_max_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_elapsed = Some(elapsed);
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the exponential multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the backoff strategy.
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets whether non-retryable errors end reactivation early.
    pub fn with_give_up_on_fatal(mut self, give_up: bool) -> Self {
        self.give_up_on_fatal = give_up;
        self
    }

    /// Returns `true` if neither budget is set.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.max_elapsed.is_none()
    }

    /// Delay before retry number `retry`. Retry 0 is the immediate first
    /// attempt after the connection was lost.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let secs = self
            .strategy
            .delay_secs(self.initial_delay, self.multiplier, retry);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Decides what follows a failed attempt.
    ///
    /// `attempts` counts every attempt made so far, including the one that
    /// just failed. `elapsed` is measured from the moment the connection
    /// was lost.
    pub fn decide(&self, attempts: u32, elapsed: Duration, error: &OpcUaError) -> RetryDecision {
        if self.give_up_on_fatal && !error.is_retryable() {
            return RetryDecision::GiveUp {
                attempts,
                reason: GiveUpReason::FatalError,
            };
        }

        if let Some(max) = self.max_attempts {
            if attempts >= max {
                return RetryDecision::GiveUp {
                    attempts,
                    reason: GiveUpReason::AttemptsExhausted,
                };
            }
        }

        let delay = self.delay_for_retry(attempts);

        if let Some(budget) = self.max_elapsed {
            if elapsed.saturating_add(delay) > budget {
                return RetryDecision::GiveUp {
                    attempts,
                    reason: GiveUpReason::DeadlineExceeded,
                };
            }
        }

        RetryDecision::Retry {
            retry: attempts,
            delay,
        }
    }

    /// Validates this policy.
    pub fn validate(&self) -> OpcUaResult<()> {
        if self.max_attempts == Some(0) {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_policy(
                "max_attempts must be at least 1",
            )));
        }

        if self.initial_delay.is_zero() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_policy(
                "initial_delay must be greater than 0",
            )));
        }

        if self.max_delay < self.initial_delay {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_policy(
                "max_delay must not be smaller than initial_delay",
            )));
        }

        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_policy(
                format!("multiplier must be a finite value >= 1.0, got {}", self.multiplier),
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
