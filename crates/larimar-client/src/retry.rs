//! Retry and backoff collaborators for the observer.

use std::time::Duration;

/// Decides whether per-replica failures during an observe round are
/// swallowed or surfaced.
pub trait RetryStrategy: Send + Sync {
    /// When true, a failed observe request simply contributes nothing this
    /// round; when false, the failure aborts the whole operation.
    fn should_retry_observe(&self) -> bool;
}

/// Swallows per-replica failures; the next round retries them.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestEffortRetry;

impl RetryStrategy for BestEffortRetry {
    fn should_retry_observe(&self) -> bool {
        true
    }
}

/// Surfaces the first per-replica failure to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFastRetry;

impl RetryStrategy for FailFastRetry {
    fn should_retry_observe(&self) -> bool {
        false
    }
}

/// Backoff schedule between observe rounds.
pub trait Delay: Send + Sync {
    /// Sleep duration before the round following `attempt`. Attempts start
    /// at 1 and increment monotonically.
    fn calculate(&self, attempt: u32) -> Duration;
}

/// The same delay for every attempt.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a fixed schedule.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Delay for FixedDelay {
    fn calculate(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubling backoff with an upper cap.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialDelay {
    unit: Duration,
    cap: Duration,
}

/// Doubling stops growing past this exponent; the cap bounds the result
/// anyway and this keeps the shift well-defined.
const MAX_EXPONENT: u32 = 16;

impl ExponentialDelay {
    /// Creates a doubling schedule: `unit`, `2*unit`, `4*unit`, ... capped
    /// at `cap`.
    pub fn new(unit: Duration, cap: Duration) -> Self {
        Self { unit, cap }
    }
}

impl Delay for ExponentialDelay {
    fn calculate(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        self.unit.saturating_mul(1 << exponent).min(self.cap)
    }
}
