//! Wait Mechanisms
//!
//! Every synchronization point in a flow is a cooperative poll against a
//! deadline. The browser renders and fetches on its own schedule; the flow
//! only observes it through predicates evaluated every `poll_interval` until
//! they hold or the deadline passes. A deadline never expires silently: it
//! always surfaces as [`FormError::Timeout`] for the caller to translate into
//! the domain error of its step.

use crate::result::{FormError, FormResult};
use std::future::Future;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (20 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set timeout from a Duration
    #[must_use]
    pub const fn with_timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// DEADLINE
// =============================================================================

/// A fixed point in time after which a wait gives up
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    timeout: Duration,
}

impl Deadline {
    /// Start a deadline now
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    /// Time since the deadline was started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left before expiry (zero once expired)
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.start.elapsed())
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.start.elapsed() >= self.timeout
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait operation
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// The value produced by the satisfied condition
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was evaluated
    pub attempts: u32,
}

// =============================================================================
// POLLING PRIMITIVES
// =============================================================================

/// Poll `check` until it yields `Some(value)` or the deadline passes.
///
/// The check is always evaluated at least once, even with a zero timeout.
/// Errors from the check end the wait immediately.
pub async fn wait_for<T, F, Fut>(
    mut check: F,
    options: &WaitOptions,
    waited_for: &str,
) -> FormResult<WaitResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FormResult<Option<T>>>,
{
    let deadline = Deadline::after(options.timeout());
    let mut attempts = 0_u32;

    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            tracing::trace!(
                waited_for,
                attempts,
                elapsed_ms = deadline.elapsed().as_millis() as u64,
                "wait satisfied"
            );
            return Ok(WaitResult {
                value,
                elapsed: deadline.elapsed(),
                attempts,
            });
        }

        if deadline.is_expired() {
            tracing::debug!(waited_for, attempts, timeout_ms = options.timeout_ms, "wait expired");
            return Err(FormError::Timeout {
                ms: options.timeout_ms,
                waited_for: waited_for.to_string(),
            });
        }

        let pause = options.poll_interval().min(deadline.remaining());
        tokio::time::sleep(pause).await;
    }
}

/// Poll a boolean predicate until it holds or the deadline passes.
pub async fn wait_until<F, Fut>(
    mut predicate: F,
    options: &WaitOptions,
    waited_for: &str,
) -> FormResult<WaitResult<()>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FormResult<bool>>,
{
    wait_for(
        || {
            let check = predicate();
            async move { Ok(check.await?.then_some(())) }
        },
        options,
        waited_for,
    )
    .await
}

/// Whether an error is the expiry of a wait (as opposed to a session failure)
#[must_use]
pub const fn is_timeout(err: &FormError) -> bool {
    matches!(err, FormError::Timeout { .. })
}

// =============================================================================
// TESTS
// =============================================================================
