//! Retry policy and the per-tile attempt state machine.

use std::fmt;
use std::time::Duration;

/// Bounded retry with exponential backoff.
///
/// Attempt 1 runs immediately. The delay before attempt `k >= 2` is
/// `initial_delay * 2^(k-2)`, so with the defaults (5 attempts, 2 s) a tile
/// waits 2, 4, 8 and 16 seconds between its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    timeout: Duration,
    initial_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is raised to 1 if zero.
    pub fn new(max_attempts: u32, timeout: Duration, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            initial_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound on a single attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Sleep before 1-indexed attempt `attempt`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.initial_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        use crate::config::defaults::{
            DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS, DEFAULT_TIMEOUT_SECS,
        };
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

/// Why a single attempt did not produce usable bytes.
///
/// Every variant consumes one attempt; none short-circuits the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// No response within the policy timeout
    Timeout,
    /// Connection, TLS or body-read error
    Transport(String),
    /// 404 from the server
    NotFound,
    /// Any other non-2xx status
    Status(u16),
    /// 2xx with an empty body
    EmptyBody,
    /// Persisting the body failed or produced a short file
    Write(String),
}

impl AttemptFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Transport(msg) => write!(f, "{}", msg),
            Self::NotFound => write!(f, "HTTP 404"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::EmptyBody => write!(f, "empty response body"),
            Self::Write(msg) => write!(f, "write failed: {}", msg),
        }
    }
}

/// Position of a tile in its retry loop.
///
/// ```text
/// Attempt(1) --fail--> Backoff{next: 2} --sleep--> Attempt(2) --fail--> ...
///                                                  Attempt(n) --fail--> Exhausted
/// ```
///
/// Success leaves the machine from any `Attempt` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// About to run 1-indexed attempt `n`
    Attempt(u32),
    /// Waiting `delay` before attempt `next`
    Backoff { next: u32, delay: Duration },
    /// Budget spent; `last` is the final attempt's failure
    Exhausted { attempts: u32, last: AttemptFailure },
}

impl AttemptState {
    pub fn start() -> Self {
        Self::Attempt(1)
    }

    /// Transition taken when `attempt` failed with `failure`.
    pub fn on_failure(attempt: u32, failure: AttemptFailure, policy: &RetryPolicy) -> Self {
        if attempt >= policy.max_attempts() {
            Self::Exhausted {
                attempts: attempt,
                last: failure,
            }
        } else {
            let next = attempt + 1;
            Self::Backoff {
                next,
                delay: policy.delay_before(next),
            }
        }
    }
}
