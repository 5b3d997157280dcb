//! Retry policy: how many attempts, how long to wait between them, how long
//! one attempt may take, and what happens when all of them fail.

use std::time::Duration;

/// Default per-attempt timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Defines how an [`Execution`](crate::Execution) retries failed attempts.
///
/// The policy is plain configuration. The pipeline copies `attempts` into a
/// loop-local counter, so one policy value can configure any number of
/// concurrent pipelines.
///
/// # Examples
///
/// ```
/// use reqtry::RetryPolicy;
/// use std::time::Duration;
///
/// // Single attempt, errors are returned to the caller
/// let once = RetryPolicy::default();
/// assert_eq!(once.attempts, 1);
///
/// // Three attempts, 200ms apart, give up quietly
/// let quiet = RetryPolicy::new(3)
///     .with_delay(Duration::from_millis(200))
///     .with_fail_on_exhaustion(false);
/// assert_eq!(quiet.delay_before_attempt(2), Some(Duration::from_millis(200)));
/// assert_eq!(quiet.delay_before_attempt(4), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never below 1.
    pub attempts: usize,

    /// Pause between a failed attempt and the next one.
    pub delay: Duration,

    /// When `true`, exhausting every attempt reports the last error to the
    /// registered observers (or returns it when there are none). When `false`
    /// the pipeline gives up silently.
    pub fail_on_exhaustion: bool,

    /// Deadline for a single attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Creates a policy with `attempts` total attempts and default settings otherwise.
    ///
    /// Zero is clamped to one attempt.
    pub fn new(attempts: usize) -> Self {
        Self {
            attempts: attempts.max(1),
            ..Self::default()
        }
    }

    /// Sets the pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets whether exhaustion is reported.
    pub fn with_fail_on_exhaustion(mut self, fail: bool) -> Self {
        self.fail_on_exhaustion = fail;
        self
    }

    /// Sets the per-attempt timeout.
    ///
    /// A zero duration falls back to [`DEFAULT_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Returns the delay to wait before the given attempt, or `None` if the
    /// attempt is past the budget.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed, so 1 = first try, which
    ///   never waits)
    pub fn delay_before_attempt(&self, attempt: usize) -> Option<Duration> {
        match attempt {
            0 => None,
            1 => Some(Duration::ZERO),
            n if n <= self.attempts => Some(self.delay),
            _ => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
            fail_on_exhaustion: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
