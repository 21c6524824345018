//! Runtime configuration types for polling and retry behavior
//!
//! These types define the budgets the condition checker and the retry
//! executor run under. They are loaded by the hierarchical config loader and
//! can be constructed directly by library callers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Condition checker budget
    #[serde(default)]
    pub check: CheckPolicy,

    /// Retry policy configurations
    #[serde(default)]
    pub retry_policies: RetryPoliciesConfig,
}

impl RuntimeConfig {
    /// Validate every policy in the configuration
    pub fn validate(&self) -> Result<()> {
        self.check.validate()?;
        self.retry_policies.default.validate("default")?;
        for (name, policy) in &self.retry_policies.operations {
            policy.validate(name)?;
        }
        Ok(())
    }
}

/// Attempt budget for the condition checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckPolicy {
    /// Maximum number of getter evaluations
    #[serde(default = "default_check_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between evaluations in milliseconds
    #[serde(default = "default_check_delay")]
    pub delay_ms: u64,
}

impl Default for CheckPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_check_attempts(),
            delay_ms: default_check_delay(),
        }
    }
}

impl CheckPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_policy(
                "check",
                "max-attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_check_attempts() -> u32 {
    10
}
fn default_check_delay() -> u64 {
    1000
}

/// Retry policy configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Default retry policy
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl Default for RetryPoliciesConfig {
    fn default() -> Self {
        let mut operations = HashMap::new();

        // Search jobs settle within seconds, poll them on a short fixed cadence
        operations.insert(
            "search-job".to_string(),
            RetryPolicy {
                max_attempts: 5,
                strategy: RetryStrategy::FixedDelay,
                backoff_multiplier: 1.0,
                initial_delay_ms: 500,
                max_delay_ms: 500,
            },
        );

        // Plugin installs hit the network, back off harder
        operations.insert(
            "plugin-install".to_string(),
            RetryPolicy {
                max_attempts: 3,
                strategy: RetryStrategy::ExponentialBackoff,
                backoff_multiplier: 2.0,
                initial_delay_ms: 2000,
                max_delay_ms: 30000,
            },
        );

        Self {
            default: RetryPolicy::default(),
            operations,
        }
    }
}

impl RetryPoliciesConfig {
    /// Policy for a named operation, falling back to the default policy
    pub fn for_operation(&self, operation: &str) -> &RetryPolicy {
        self.operations.get(operation).unwrap_or(&self.default)
    }
}

/// Retry policy for an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of invocations, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// A policy that re-invokes after a constant delay
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            max_attempts,
            strategy: RetryStrategy::FixedDelay,
            backoff_multiplier: 1.0,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
        }
    }

    /// Check the policy invariants; `name` is used in the error message
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_policy(name, "max-attempts must be at least 1"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::invalid_policy(
                name,
                format!(
                    "backoff-multiplier must be >= 1.0, got {}",
                    self.backoff_multiplier
                ),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::invalid_policy(
                name,
                format!(
                    "initial-delay-ms ({}) exceeds max-delay-ms ({})",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            ));
        }
        Ok(())
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}

/// Retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Re-invoke immediately
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetryStrategy::None => "none",
            RetryStrategy::FixedDelay => "fixed-delay",
            RetryStrategy::ExponentialBackoff => "exponential-backoff",
            RetryStrategy::LinearBackoff => "linear-backoff",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for RetryStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RetryStrategy::None),
            "fixed" | "fixed-delay" => Ok(RetryStrategy::FixedDelay),
            "exponential" | "exponential-backoff" => Ok(RetryStrategy::ExponentialBackoff),
            "linear" | "linear-backoff" => Ok(RetryStrategy::LinearBackoff),
            other => Err(Error::invalid_config(format!(
                "Unknown retry strategy '{}'. Valid strategies: none, fixed-delay, exponential-backoff, linear-backoff",
                other
            ))),
        }
    }
}
