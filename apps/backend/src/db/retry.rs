//! Timeout and retry policy for repository calls.
//!
//! Every call is bounded by `op_timeout`. Reads retry any transient failure
//! (`DbUnavailable`, `Timeout`). Writes retry only `DbUnavailable`: a write
//! that timed out may already have committed, so repeating it is not safe.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::errors::domain::{DomainError, InfraErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`, with up to 50% random jitter subtracted.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let raw = self.base_delay.saturating_mul(1u32 << exp);
        let capped = raw.min(self.max_delay);
        let ms = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(0..=ms / 2);
        Duration::from_millis(ms - jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50), Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Write,
}

impl CallKind {
    fn retries(self, err: &DomainError) -> bool {
        match self {
            CallKind::Read => err.is_transient(),
            CallKind::Write => matches!(err, DomainError::Infra(InfraErrorKind::DbUnavailable, _)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub op_timeout: Duration,
    pub retry: RetryPolicy,
}

impl CallPolicy {
    pub fn new(op_timeout: Duration, retry: RetryPolicy) -> Self {
        Self { op_timeout, retry }
    }

    pub async fn read<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        self.run(op, CallKind::Read, f).await
    }

    pub async fn write<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        self.run(op, CallKind::Write, f).await
    }

    async fn run<T, F, Fut>(&self, op: &'static str, kind: CallKind, mut f: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.op_timeout, f()).await {
                Ok(res) => res,
                Err(_) => Err(DomainError::infra(
                    InfraErrorKind::Timeout,
                    format!("{op} timed out after {}ms", self.op_timeout.as_millis()),
                )),
            };

            match outcome {
                Ok(val) => {
                    if attempt > 1 {
                        debug!(op, attempt, "db call succeeded after retry");
                    }
                    return Ok(val);
                }
                Err(err) if attempt < self.retry.max_attempts && kind.retries(&err) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(op, attempt, delay_ms = delay.as_millis() as u64, error = %err, "transient db failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), RetryPolicy::default())
    }
}
