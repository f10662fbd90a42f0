//! Retry classification and backoff delay computation.
//!
//! The policy is consulted once per failed provider call. Attempt counters
//! are per call: exhausting retries on one stage never blocks another
//! stage or session.

use std::time::Duration;

use rand::Rng;

use crate::provider::ProviderError;

/// Retryable failure classes. Fatal and input-too-large failures never
/// reach the policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryClass {
    /// The provider signalled its own throttling.
    RateLimited,
    /// Network, timeout, or 5xx-class failure.
    Transient,
}

impl RetryClass {
    /// Classify a provider error, or `None` when it must not be retried.
    pub fn of(error: &ProviderError) -> Option<Self> {
        match error {
            ProviderError::RateLimited { .. } => Some(Self::RateLimited),
            ProviderError::Transient(_) => Some(Self::Transient),
            ProviderError::InputTooLarge(_) | ProviderError::Fatal(_) => None,
        }
    }
}

/// Exponential backoff with per-class base delays, caps, and jitter.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    /// First delay after a provider rate-limit signal.
    pub base_delay: Duration,
    /// Ceiling for computed delays (a provider retry-after hint may exceed it).
    pub max_delay: Duration,
    /// Maximum attempts for rate-limit failures.
    pub max_attempts: u32,
    /// First delay after a transient failure.
    pub transient_base_delay: Duration,
    /// Maximum attempts for transient failures.
    pub transient_max_attempts: u32,
    /// Uniform jitter added on top, as a fraction of the computed delay.
    pub jitter_fraction: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(120),
            max_delay: Duration::from_secs(960),
            max_attempts: 5,
            transient_base_delay: Duration::from_secs(5),
            transient_max_attempts: 4,
            jitter_fraction: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based: the first failure of
    /// a call asks for attempt 1). Returns `None` once the class's attempt
    /// budget is exhausted.
    ///
    /// The delay doubles per consecutive attempt, capped at `max_delay`,
    /// is raised to the provider's `retry_after` hint when that is larger,
    /// and gains uniform random jitter in `[0, jitter_fraction × delay]`.
    pub fn delay_for(
        &self,
        class: RetryClass,
        attempt: u32,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        let (base, max_attempts) = match class {
            RetryClass::RateLimited => (self.base_delay, self.max_attempts),
            RetryClass::Transient => (self.transient_base_delay, self.transient_max_attempts),
        };
        if attempt == 0 || attempt > max_attempts {
            return None;
        }

        let exp = base.saturating_mul(1u32 << (attempt - 1).min(20));
        let mut delay = exp.min(self.max_delay);
        if let Some(hint) = retry_after {
            delay = delay.max(hint);
        }

        if self.jitter_fraction > 0.0 {
            let jitter_max = delay.as_secs_f64() * self.jitter_fraction;
            let jitter = rand::rng().random_range(0.0..=jitter_max);
            delay += Duration::from_secs_f64(jitter);
        }
        Some(delay)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
