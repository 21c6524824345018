//! # settle-core
//!
//! Core library for settle providing:
//! - A condition checker that polls a getter until it observes an expected value
//! - A retry execution engine with policy-based configuration
//! - Hierarchical runtime configuration (embedded defaults, file, environment)
//! - Typed contracts for the remote search API and listener start hooks that
//!   callers drive through the checker and retry envelope

pub mod check;
pub mod clock;
pub mod config;
pub mod error;
pub mod hooks;
pub mod retry;
pub mod search;
pub mod types;

pub use check::{CheckError, CheckOutcome, Checker, Expectation, PollResult};
pub use clock::{FakeClock, Sleeper, ThreadSleeper};
pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use hooks::{CallbackStartHook, HookRequest, HookResponse, StartHook};
pub use retry::{retry_blocking, retry_with_policy, RetryError, RetryExecutorBuilder, Transient};
pub use search::{ApiError, ApiVersion, SearchApi};
pub use types::{CheckPolicy, RetryPolicy, RetryStrategy, RuntimeConfig};
