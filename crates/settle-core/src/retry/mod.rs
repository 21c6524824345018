//! Policy-based retry envelope for fallible actions
//!
//! Wraps an action that fails while a remote resource is not ready yet and
//! re-invokes it until it succeeds or the policy's attempt budget runs out.
//! A predicate decides which errors are transient; anything else is
//! returned immediately.
//!
//! # Features
//!
//! - Retry strategies: None, Fixed, Exponential, Linear backoff
//! - Optional jitter of up to 25% on every delay
//! - Observable attempts via the `RetryObserver` trait
//! - Async (`execute`) and blocking (`execute_blocking`) execution
//!
//! # Example
//!
//! ```rust,no_run
//! use settle_core::retry::{retry_with_policy, RetryError};
//! use settle_core::types::RetryPolicy;
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let policy = RetryPolicy::default();
//!
//!     retry_with_policy(&policy, || async {
//!         Ok("success".to_string())
//!     }).await
//! }
//! ```

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::{retry_blocking, retry_with_policy, RetryExecutor, RetryExecutorBuilder};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use strategies::{
    calculate_delay, AlwaysRetry, ClosurePredicate, MessagePredicate, NeverRetry, RetryPredicate,
    Transient, TransientOnly,
};
