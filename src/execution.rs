//! Retry-loop engine.
//!
//! An [`Execution`] owns one or more asynchronous actions and zero or more
//! error observers, and runs the actions under a [`RetryPolicy`]. It is used
//! by [`Client`](crate::Client) for every request, and can be used directly to
//! retry any fallible async work.

use crate::{Error, Result, RetryPolicy};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type Action<'a, T> = Box<dyn FnMut(usize) -> BoxFuture<'a, Result<T>> + Send + 'a>;
type Observer<'a> = Box<dyn Fn(&Error) -> Result<()> + Send + Sync + 'a>;

/// One retry-able unit of work.
///
/// Actions receive the 1-indexed attempt number. Observers run once, when the
/// last permitted attempt has failed and the policy asks for failures to be
/// reported. An observer that returns `Err` ends the pipeline with that error.
/// Without observers the last error is returned to the caller.
///
/// Errors that are not retryable (see [`Error::is_retryable`]), such as
/// [`Error::Cancelled`] or a [`Error::ConfigurationError`] raised inside an
/// attempt, end the pipeline at once and are returned without reaching the
/// observers.
///
/// # Examples
///
/// ```
/// use reqtry::{Error, Execution, RetryPolicy};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Error> {
/// let calls = AtomicUsize::new(0);
///
/// let value = Execution::new(RetryPolicy::new(3))
///     .action(|attempt| {
///         let calls = &calls;
///         async move {
///             calls.fetch_add(1, Ordering::SeqCst);
///             if attempt < 3 {
///                 Err(Error::Timeout)
///             } else {
///                 Ok(attempt * 10)
///             }
///         }
///     })
///     .get_result_not_empty()
///     .await?;
///
/// assert_eq!(value, 30);
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # Ok(())
/// # }
/// ```
pub struct Execution<'a, T> {
    actions: Vec<Action<'a, T>>,
    observers: Vec<Observer<'a>>,
    policy: RetryPolicy,
    default: Option<T>,
    cancellation: Option<CancellationToken>,
}

impl<'a, T: Send + 'a> Execution<'a, T> {
    /// Creates an empty pipeline running under `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            actions: Vec::new(),
            observers: Vec::new(),
            policy,
            default: None,
            cancellation: None,
        }
    }

    /// Registers an action.
    ///
    /// In [`get_result`](Self::get_result) mode several actions are
    /// alternates: attempt `k` runs action `(k - 1) % n`. In
    /// [`execute`](Self::execute) mode they are steps run in order, sharing
    /// the attempt budget.
    pub fn action<F, Fut>(mut self, mut action: F) -> Self
    where
        F: FnMut(usize) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.actions
            .push(Box::new(move |attempt| Box::pin(action(attempt))));
        self
    }

    /// Registers an observer for the final error.
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Error) -> Result<()> + Send + Sync + 'a,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Sets the value [`get_result`](Self::get_result) returns when every
    /// attempt failed without the failure being returned.
    pub fn with_default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Stops the pipeline with [`Error::Cancelled`] as soon as `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the policy this pipeline runs under.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs the actions until one produces a value.
    ///
    /// Returns `Ok(None)` (or the configured default) when every attempt
    /// failed and the failure was handled by observers or the policy does not
    /// report exhaustion.
    ///
    /// # Errors
    ///
    /// * [`Error::ConfigurationError`] if no action was registered.
    /// * The last attempt's error when no observer is registered.
    /// * Whatever an observer returns.
    /// * [`Error::Cancelled`] if the cancellation token fired.
    pub async fn get_result(mut self) -> Result<Option<T>> {
        self.ensure_actions()?;

        let count = self.actions.len();
        let mut remaining = self.policy.attempts.max(1);
        let mut attempt = 0;

        while remaining > 0 {
            attempt += 1;
            let index = (attempt - 1) % count;

            match self.run_attempt(index, attempt).await {
                Ok(value) => return Ok(Some(value)),
                Err(error) => {
                    remaining -= 1;
                    self.handle_failure(error, attempt, remaining).await?;
                }
            }
        }

        Ok(self.default.take())
    }

    /// Like [`get_result`](Self::get_result), but an absent result is an
    /// [`Error::Empty`].
    pub async fn get_result_not_empty(self) -> Result<T> {
        self.get_result().await?.ok_or(Error::Empty)
    }

    /// Runs every action in registration order, retrying a failed action
    /// until it succeeds or the attempt budget is spent. Produced values are
    /// discarded.
    ///
    /// # Errors
    ///
    /// Same as [`get_result`](Self::get_result).
    pub async fn execute(mut self) -> Result<()> {
        self.ensure_actions()?;

        let count = self.actions.len();
        let mut remaining = self.policy.attempts.max(1);
        let mut attempt = 0;
        let mut step = 0;

        while step < count && remaining > 0 {
            attempt += 1;

            match self.run_attempt(step, attempt).await {
                Ok(_) => step += 1,
                Err(error) => {
                    remaining -= 1;
                    self.handle_failure(error, attempt, remaining).await?;
                }
            }
        }

        Ok(())
    }

    fn ensure_actions(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::ConfigurationError(
                "no action registered".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs one action under the per-attempt deadline and the cancellation token.
    async fn run_attempt(&mut self, index: usize, attempt: usize) -> Result<T> {
        let timeout = self.policy.timeout;
        let action = &mut self.actions[index];
        let future = action(attempt);
        let bounded = async move {
            tokio::time::timeout(timeout, future)
                .await
                .unwrap_or(Err(Error::Timeout))
        };

        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }

    /// Decides what a failed attempt means: wait and go again, report, or stop.
    async fn handle_failure(
        &mut self,
        error: Error,
        attempt: usize,
        remaining: usize,
    ) -> Result<()> {
        if !error.is_retryable() {
            return Err(error);
        }

        tracing::warn!(
            error = %error,
            attempt = attempt,
            remaining = remaining,
            "Attempt failed"
        );

        if remaining == 0 {
            if !self.policy.fail_on_exhaustion {
                tracing::debug!(attempts = attempt, "Attempts exhausted, failing silently");
                return Ok(());
            }
            if self.observers.is_empty() {
                return Err(error);
            }
            for observer in &self.observers {
                observer(&error)?;
            }
            return Ok(());
        }

        let failures = self.policy.attempts.max(1) - remaining;
        if let Some(delay) = self.policy.delay_before_attempt(failures + 1) {
            if !delay.is_zero() {
                tracing::info!(
                    delay_ms = delay.as_millis(),
                    attempt = attempt,
                    "Retrying after delay"
                );
                match &self.cancellation {
                    Some(token) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => return Err(Error::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }
        }

        Ok(())
    }
}
