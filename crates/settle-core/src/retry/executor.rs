//! Retry execution engine
//!
//! This module provides the core retry loop with configurable policies,
//! predicates, and observers. The same decision logic backs the async
//! (`execute`) and blocking (`execute_blocking`) entry points.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::clock::{Sleeper, ThreadSleeper};
use crate::types::RetryPolicy;

use super::error::RetryError;
use super::observer::{NoOpObserver, RetryObserver, TracingObserver};
use super::strategies::{calculate_delay, AlwaysRetry, RetryPredicate};

/// Execute an async action with retry logic based on a policy
///
/// Every error is treated as transient; use `RetryExecutorBuilder` with a
/// predicate to narrow that down.
///
/// # Example
///
/// ```rust,no_run
/// use settle_core::retry::retry_with_policy;
/// use settle_core::types::RetryPolicy;
///
/// async fn example() {
///     let policy = RetryPolicy::default();
///
///     let result = retry_with_policy(&policy, || async {
///         Ok::<_, std::io::Error>("success")
///     }).await;
/// }
/// ```
pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryExecutorBuilder::new()
        .with_policy(policy.clone())
        .with_observer(TracingObserver::default())
        .build()
        .execute(op)
        .await
}

/// Blocking counterpart of [`retry_with_policy`], sleeping on the calling thread
pub fn retry_blocking<F, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    RetryExecutorBuilder::new()
        .with_policy(policy.clone())
        .with_observer(TracingObserver::default())
        .build()
        .execute_blocking(&ThreadSleeper, op)
}

/// Builder for configuring a `RetryExecutor`
///
/// # Example
///
/// ```rust
/// use settle_core::retry::{RetryExecutorBuilder, TracingObserver, TransientOnly};
/// use settle_core::types::RetryPolicy;
///
/// let executor = RetryExecutorBuilder::new()
///     .with_policy(RetryPolicy::default())
///     .with_predicate(TransientOnly)
///     .with_observer(TracingObserver::new("install-plugin"))
///     .with_jitter(false)
///     .build();
/// ```
pub struct RetryExecutorBuilder<P = AlwaysRetry, O = NoOpObserver> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    jitter: bool,
}

impl Default for RetryExecutorBuilder<AlwaysRetry, NoOpObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder<AlwaysRetry, NoOpObserver> {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            predicate: AlwaysRetry,
            observer: NoOpObserver,
            jitter: true,
        }
    }
}

impl<P, O> RetryExecutorBuilder<P, O> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the predicate that classifies errors as transient
    pub fn with_predicate<P2>(self, predicate: P2) -> RetryExecutorBuilder<P2, O> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate,
            observer: self.observer,
            jitter: self.jitter,
        }
    }

    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<P, O2> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            observer,
            jitter: self.jitter,
        }
    }

    /// Enable or disable jitter. Enabled by default.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn build(self) -> RetryExecutor<P, O> {
        RetryExecutor {
            policy: self.policy,
            predicate: self.predicate,
            observer: self.observer,
            jitter: self.jitter,
        }
    }
}

/// A retry executor with configurable policy, predicate, and observer
///
/// Holds no per-invocation state: one executor can run any number of
/// independent actions.
pub struct RetryExecutor<P, O> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    jitter: bool,
}

/// What to do after a failed attempt
enum Next<E> {
    RetryAfter(Duration),
    Fail(RetryError<E>),
}

impl<P, O> RetryExecutor<P, O>
where
    O: RetryObserver,
{
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// A policy with `max_attempts == 0` still invokes the action once
    fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    fn after_failure<E>(&self, attempt: u32, err: E, start: Instant) -> Next<E>
    where
        E: Display,
        P: RetryPredicate<E>,
    {
        if !self.predicate.should_retry(&err) {
            self.observer.on_non_retryable(attempt, &err);
            return Next::Fail(RetryError::non_retryable(attempt, err));
        }

        if attempt >= self.max_attempts() {
            self.observer.on_exhausted(attempt, &err);
            return Next::Fail(RetryError::exhausted(attempt, err, start.elapsed()));
        }

        let delay = calculate_delay(&self.policy, attempt, self.jitter);
        self.observer.on_attempt_failed(attempt, &err, delay);
        Next::RetryAfter(delay)
    }

    /// Execute an async action with retry logic
    pub async fn execute<F, Fut, T, E>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: RetryPredicate<E>,
    {
        let start = Instant::now();
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            self.observer.on_attempt_start(attempt, max_attempts);

            match op().await {
                Ok(result) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(result);
                }
                Err(err) => match self.after_failure(attempt, err, start) {
                    Next::Fail(retry_err) => return Err(retry_err),
                    Next::RetryAfter(delay) => {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                },
            }

            attempt += 1;
        }
    }

    /// Execute a blocking action with retry logic, sleeping through `sleeper`
    pub fn execute_blocking<S, F, T, E>(&self, sleeper: &S, mut op: F) -> Result<T, RetryError<E>>
    where
        S: Sleeper + ?Sized,
        F: FnMut() -> Result<T, E>,
        E: Display,
        P: RetryPredicate<E>,
    {
        let start = Instant::now();
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            self.observer.on_attempt_start(attempt, max_attempts);

            match op() {
                Ok(result) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(result);
                }
                Err(err) => match self.after_failure(attempt, err, start) {
                    Next::Fail(retry_err) => return Err(retry_err),
                    Next::RetryAfter(delay) => sleeper.sleep(delay),
                },
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::retry::observer::StatsObserver;
    use crate::retry::strategies::ClosurePredicate;
    use crate::types::RetryStrategy;
    use std::io;
    use std::sync::Arc;

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            strategy: RetryStrategy::FixedDelay,
            backoff_multiplier: 2.0,
            initial_delay_ms: 10,
            max_delay_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let observer = Arc::new(StatsObserver::new());

        let result: Result<&str, RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_policy(test_policy())
            .with_observer(observer.clone())
            .build()
            .execute(|| async { Ok("success") })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.failures(), 0);
    }

    #[test]
    fn test_blocking_sleeps_between_attempts_only() {
        let clock = FakeClock::new();
        let observer = Arc::new(StatsObserver::new());

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_policy(test_policy())
            .with_observer(observer.clone())
            .with_jitter(false)
            .build()
            .execute_blocking(&clock, || Err(io::Error::other("always fails")));

        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        // 3 attempts, 2 gaps
        assert_eq!(clock.sleeps(), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(20));
        assert_eq!(observer.failures(), 2);
        assert_eq!(observer.exhaustions(), 1);
    }

    #[test]
    fn test_blocking_non_retryable_on_second_attempt() {
        let clock = FakeClock::new();
        let mut calls = 0;

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_policy(test_policy())
            .with_predicate(ClosurePredicate::new(|err: &io::Error| {
                err.kind() == io::ErrorKind::TimedOut
            }))
            .with_jitter(false)
            .build()
            .execute_blocking(&clock, || {
                calls += 1;
                if calls == 1 {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "slow"))
                } else {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
                }
            });

        let err = result.unwrap_err();
        assert!(err.is_non_retryable());
        assert_eq!(err.attempts(), 2);
        assert_eq!(calls, 2);
        assert_eq!(clock.sleeps(), 1);
    }

    #[test]
    fn test_zero_max_attempts_invokes_once() {
        let clock = FakeClock::new();
        let policy = RetryPolicy {
            max_attempts: 0,
            ..test_policy()
        };
        let mut calls = 0;

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_policy(policy)
            .build()
            .execute_blocking(&clock, || {
                calls += 1;
                Err(io::Error::other("error"))
            });

        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(calls, 1);
        assert_eq!(clock.sleeps(), 0);
    }
}
