use std::time::Duration;

use rand::Rng;

use crate::config::BatchOptions;
use crate::error::ClientError;

/// Jitter is drawn from `[0, delay * JITTER_RATIO]`.
const JITTER_RATIO: f64 = 0.1;

/// Exponent cap so the backoff computation cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retrying cannot help.
    Fatal,
    /// Network or server trouble, retried with exponential backoff.
    Transient,
    /// Rate limit or maintenance, retried after a fixed delay.
    RateLimited,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClass::Fatal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    rate_limit_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, rate_limit_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            rate_limit_delay,
            jitter: true,
        }
    }

    pub fn from_options(options: &BatchOptions) -> Self {
        Self::new(
            options.max_retries,
            Duration::try_from_secs_f64(options.retry_delay_seconds).unwrap_or(Duration::MAX),
            options.rate_limit_delay,
        )
    }

    /// Disables jitter, making delays deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn classify(&self, error: &ClientError) -> ErrorClass {
        match error {
            ClientError::Network(_)
            | ClientError::Connection(_)
            | ClientError::Server(_)
            | ClientError::Timeout => ErrorClass::Transient,
            ClientError::RateLimited { .. } | ClientError::Maintenance(_) => {
                ErrorClass::RateLimited
            }
            ClientError::Validation(_)
            | ClientError::Unauthorized(_)
            | ClientError::Cancelled
            | ClientError::Status { .. } => ErrorClass::Fatal,
        }
    }

    /// Whether a chunk that has made `attempt` attempts (counted from 1) may try again.
    pub fn should_retry(&self, attempt: u32, class: ErrorClass) -> bool {
        class.is_retryable() && attempt <= self.max_retries
    }

    /// Delay before the attempt following `attempt` (counted from 1).
    pub fn delay_for(&self, attempt: u32, class: ErrorClass) -> Duration {
        match class {
            ErrorClass::Fatal => Duration::ZERO,
            ErrorClass::RateLimited => self.rate_limit_delay,
            ErrorClass::Transient => {
                let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
                let delay = self.base_delay.saturating_mul(1u32 << exponent);
                delay.saturating_add(self.jitter_for(delay))
            }
        }
    }

    /// Like [`delay_for`](Self::delay_for), but honours a server retry-after hint.
    pub fn delay_after(&self, attempt: u32, error: &ClientError) -> Duration {
        let class = self.classify(error);
        match (class, error.retry_after()) {
            (ErrorClass::RateLimited, Some(hint)) => hint,
            _ => self.delay_for(attempt, class),
        }
    }

    fn jitter_for(&self, delay: Duration) -> Duration {
        let max_jitter = delay.as_secs_f64() * JITTER_RATIO;
        if !self.jitter || max_jitter <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(rand::thread_rng().gen_range(0.0..=max_jitter))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_options(&BatchOptions::default())
    }
}
