//! Type definitions for settle

mod runtime_config;

pub use runtime_config::{
    CheckPolicy, RetryPoliciesConfig, RetryPolicy, RetryStrategy, RuntimeConfig,
};
