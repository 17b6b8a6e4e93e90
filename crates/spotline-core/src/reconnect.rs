//! Bounded-retry reconnection policy.
//!
//! Pure policy machine in the action-pattern style: the runtime reports each
//! drop, the policy answers with a delay or gives up. The attempt budget
//! spans the whole session: a successful reconnect does not refund
//! attempts, so one session gets at most one retry chain.

use std::time::Duration;

/// Maximum reconnect attempts after the initial connect.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between reconnect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Delay before the first retry when the connection closed immediately.
pub const DEFAULT_EARLY_CLOSE_DELAY: Duration = Duration::from_secs(1);

/// Why the link dropped or failed to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCause {
    /// The connect attempt itself failed.
    ConnectFailed,
    /// The connection closed immediately after opening.
    ClosedEarly,
    /// An established connection closed mid-session.
    ClosedMidSession,
}

/// Retry parameters.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempt budget after the initial connect.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
    /// Delay for the very first retry after an immediate close.
    pub early_close_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            early_close_delay: DEFAULT_EARLY_CLOSE_DELAY,
        }
    }
}

/// Verdict for one reported drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt again after this delay.
    RetryAfter(Duration),
    /// Budget exhausted; the failure is terminal.
    GiveUp,
}

/// Bounded-retry policy for one session's connection.
#[derive(Debug, Clone)]
pub struct Reconnector {
    config: RetryConfig,
    attempts: u32,
}

impl Reconnector {
    /// Fresh policy with a full budget.
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempts: 0 }
    }

    /// Reconnect attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the budget is exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_retries
    }

    /// Reports one drop and decides the next step.
    ///
    /// The very first retry after an immediate close waits the shorter
    /// early-close delay; every other retry waits the fixed retry delay.
    pub fn on_drop(&mut self, cause: DropCause) -> RetryDecision {
        if self.is_exhausted() {
            return RetryDecision::GiveUp;
        }

        let delay = if self.attempts == 0 && cause == DropCause::ClosedEarly {
            self.config.early_close_delay
        } else {
            self.config.retry_delay
        };
        self.attempts += 1;
        RetryDecision::RetryAfter(delay)
    }
}

impl Default for Reconnector {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
