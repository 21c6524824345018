//! Poll a getter until it observes an expected value
//!
//! A [`Checker`] repeatedly calls a getter that reads some external,
//! eventually-consistent state and compares what it sees against an
//! [`Expectation`]. The getter may return one value or a collection; for a
//! collection the check holds when any element is accepted. `negate` turns
//! the check into "wait until nothing matches".
//!
//! An empty collection never matches. Without `negate` the checker keeps
//! polling through empty observations until its budget runs out, since the
//! remote side may still populate the collection.
//!
//! # Example
//!
//! ```rust
//! use settle_core::check::Checker;
//! use settle_core::clock::FakeClock;
//!
//! let mut statuses = vec!["Stopped", "Running"];
//! let outcome = Checker::new("Stopped")
//!     .max_attempts(2)
//!     .run_with(&FakeClock::new(), || statuses.pop().unwrap_or_default())
//!     .unwrap();
//!
//! assert_eq!(outcome.attempts, 2);
//! ```

mod matching;

pub use matching::{Expectation, PollResult};

use std::convert::Infallible;
use std::fmt::{self, Debug};
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Sleeper, ThreadSleeper};
use crate::retry::Transient;
use crate::types::CheckPolicy;

use matching::evaluate;

/// Successful check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome<T> {
    /// Attempt on which the condition held (1-indexed)
    pub attempts: u32,
    /// Time since the first attempt, as measured by the sleeper in use
    /// (tokio's clock for async runs)
    pub elapsed: Duration,
    /// The observation that satisfied the condition
    pub observed: PollResult<T>,
    /// Position of the accepted element in the observation; `None` for negated checks
    pub matched: Option<usize>,
}

/// Errors returned by a check
///
/// `E` is the getter's error type for fallible getters and `Infallible`
/// otherwise.
#[derive(Debug)]
pub enum CheckError<T, E = Infallible> {
    /// The condition never held within the attempt budget
    Timeout {
        attempts: u32,
        last_observed: PollResult<T>,
    },

    /// The getter itself failed; not retried
    Getter(E),
}

impl<T, E> CheckError<T, E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CheckError::Timeout { .. })
    }

    /// The last observation, if the check timed out
    pub fn last_observed(&self) -> Option<&PollResult<T>> {
        match self {
            CheckError::Timeout { last_observed, .. } => Some(last_observed),
            CheckError::Getter(_) => None,
        }
    }
}

impl<T: Debug, E: fmt::Display> fmt::Display for CheckError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Timeout {
                attempts,
                last_observed,
            } => write!(
                f,
                "condition not met after {} attempts, last observed {:?}",
                attempts, last_observed
            ),
            CheckError::Getter(err) => write!(f, "getter failed: {}", err),
        }
    }
}

impl<T: Debug, E: std::error::Error + 'static> std::error::Error for CheckError<T, E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckError::Timeout { .. } => None,
            CheckError::Getter(err) => Some(err),
        }
    }
}

/// A timed-out check is worth retrying as a whole; a getter error only if it is transient itself
impl<T, E: Transient> Transient for CheckError<T, E> {
    fn is_transient(&self) -> bool {
        match self {
            CheckError::Timeout { .. } => true,
            CheckError::Getter(err) => err.is_transient(),
        }
    }
}

/// Poll a getter with the given policy until it produces `expected`
///
/// Shorthand for `Checker::new(expected).policy(policy).run(getter)`.
pub fn check<T, F, R>(expected: T, policy: CheckPolicy, getter: F) -> Result<CheckOutcome<T>, CheckError<T>>
where
    T: PartialEq + Debug,
    F: FnMut() -> R,
    R: Into<PollResult<T>>,
{
    Checker::new(expected).policy(policy).run(getter)
}

/// A condition to wait for, built once per assertion
#[derive(Debug, Clone)]
pub struct Checker<T> {
    expectation: Expectation<T>,
    reverse: bool,
    negate: bool,
    policy: CheckPolicy,
    label: String,
}

enum Step<T> {
    Done(CheckOutcome<T>),
    TimedOut(CheckError<T, Infallible>),
    Again(Duration),
}

impl<T> Checker<T>
where
    T: PartialEq + Debug,
{
    pub fn new(expected: T) -> Self {
        Self::expecting(Expectation::Equals(expected))
    }

    /// Accept any of `values`
    pub fn one_of(values: Vec<T>) -> Self {
        Self::expecting(Expectation::OneOf(values))
    }

    pub fn expecting(expectation: Expectation<T>) -> Self {
        Self {
            expectation,
            reverse: false,
            negate: false,
            policy: CheckPolicy::default(),
            label: "check".to_string(),
        }
    }

    /// Scan collections back to front
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Wait until nothing matches instead
    pub fn negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn policy(mut self, policy: CheckPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.policy.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Name used in log events
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn expectation(&self) -> &Expectation<T> {
        &self.expectation
    }

    /// Whether a single observation satisfies this check
    pub fn is_satisfied_by(&self, observed: &PollResult<T>) -> bool {
        evaluate(observed, &self.expectation, self.reverse, self.negate).satisfied
    }

    fn budget(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    fn step(&self, attempt: u32, observed: PollResult<T>, elapsed: Duration) -> Step<T> {
        let evaluation = evaluate(&observed, &self.expectation, self.reverse, self.negate);

        if evaluation.satisfied {
            if attempt > 1 {
                info!(label = %self.label, attempt, "condition met");
            } else {
                debug!(label = %self.label, "condition met on first attempt");
            }
            return Step::Done(CheckOutcome {
                attempts: attempt,
                elapsed,
                observed,
                matched: evaluation.matched,
            });
        }

        let max_attempts = self.budget();
        if attempt >= max_attempts {
            warn!(
                label = %self.label,
                attempts = attempt,
                last_observed = ?observed,
                "condition not met, giving up"
            );
            return Step::TimedOut(CheckError::Timeout {
                attempts: attempt,
                last_observed: observed,
            });
        }

        debug!(
            label = %self.label,
            attempt,
            max_attempts,
            observed = ?observed,
            delay_ms = self.policy.delay_ms,
            "condition not met yet"
        );
        Step::Again(self.policy.delay())
    }

    /// Poll on the calling thread, sleeping with `std::thread::sleep`
    pub fn run<F, R>(&self, getter: F) -> Result<CheckOutcome<T>, CheckError<T>>
    where
        F: FnMut() -> R,
        R: Into<PollResult<T>>,
    {
        self.run_with(&ThreadSleeper, getter)
    }

    pub fn run_with<S, F, R>(&self, sleeper: &S, mut getter: F) -> Result<CheckOutcome<T>, CheckError<T>>
    where
        S: Sleeper + ?Sized,
        F: FnMut() -> R,
        R: Into<PollResult<T>>,
    {
        self.try_run_with(sleeper, || Ok::<R, Infallible>(getter()))
    }

    /// Poll a fallible getter; a getter error ends the check immediately
    pub fn try_run<F, R, E>(&self, getter: F) -> Result<CheckOutcome<T>, CheckError<T, E>>
    where
        F: FnMut() -> Result<R, E>,
        R: Into<PollResult<T>>,
    {
        self.try_run_with(&ThreadSleeper, getter)
    }

    pub fn try_run_with<S, F, R, E>(
        &self,
        sleeper: &S,
        mut getter: F,
    ) -> Result<CheckOutcome<T>, CheckError<T, E>>
    where
        S: Sleeper + ?Sized,
        F: FnMut() -> Result<R, E>,
        R: Into<PollResult<T>>,
    {
        let start = sleeper.now();
        let mut attempt = 1;

        loop {
            let observed = match getter() {
                Ok(observed) => observed.into(),
                Err(err) => return Err(CheckError::Getter(err)),
            };

            let elapsed = sleeper.now().saturating_duration_since(start);
            match self.step(attempt, observed, elapsed) {
                Step::Done(outcome) => return Ok(outcome),
                Step::TimedOut(err) => return Err(widen(err)),
                Step::Again(delay) => sleeper.sleep(delay),
            }

            attempt += 1;
        }
    }

    /// Poll an async getter, sleeping with `tokio::time::sleep`
    pub async fn run_async<F, Fut, R>(&self, mut getter: F) -> Result<CheckOutcome<T>, CheckError<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = R>,
        R: Into<PollResult<T>>,
    {
        self.try_run_async(|| {
            let pending = getter();
            async move { Ok::<R, Infallible>(pending.await) }
        })
        .await
    }

    pub async fn try_run_async<F, Fut, R, E>(&self, mut getter: F) -> Result<CheckOutcome<T>, CheckError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: Into<PollResult<T>>,
    {
        let start = tokio::time::Instant::now();
        let mut attempt = 1;

        loop {
            let observed = match getter().await {
                Ok(observed) => observed.into(),
                Err(err) => return Err(CheckError::Getter(err)),
            };

            match self.step(attempt, observed, start.elapsed()) {
                Step::Done(outcome) => return Ok(outcome),
                Step::TimedOut(err) => return Err(widen(err)),
                Step::Again(delay) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            attempt += 1;
        }
    }
}

fn widen<T, E>(err: CheckError<T, Infallible>) -> CheckError<T, E> {
    match err {
        CheckError::Timeout {
            attempts,
            last_observed,
        } => CheckError::Timeout {
            attempts,
            last_observed,
        },
        CheckError::Getter(never) => match never {},
    }
}
