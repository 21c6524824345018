//! Retry command

use std::fmt;
use std::process::ExitStatus;

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use settle_core::retry::{ClosurePredicate, RetryError, RetryExecutorBuilder, TracingObserver};
use tokio::process::Command;

use super::{load_config, split_command};
use crate::cli::RetryArgs;
use crate::output;

/// A run of the command that did not succeed
#[derive(Debug)]
enum RunFailure {
    Spawn(std::io::Error),
    /// Exit code, or `None` when killed by a signal
    Exit(Option<i32>),
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::Spawn(err) => write!(f, "could not start: {}", err),
            RunFailure::Exit(Some(code)) => write!(f, "exited with code {}", code),
            RunFailure::Exit(None) => f.write_str("terminated by a signal"),
        }
    }
}

/// Spawn failures are never retried. With no listed codes every failed exit is.
fn is_retryable(failure: &RunFailure, transient_codes: &[i32]) -> bool {
    match failure {
        RunFailure::Spawn(_) => false,
        RunFailure::Exit(_) if transient_codes.is_empty() => true,
        RunFailure::Exit(code) => code.is_some_and(|code| transient_codes.contains(&code)),
    }
}

fn check_status(status: ExitStatus) -> Result<(), RunFailure> {
    if status.success() {
        Ok(())
    } else {
        Err(RunFailure::Exit(status.code()))
    }
}

pub async fn run(args: RetryArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let (program, program_args) = split_command(&args.command)?;

    let config = load_config(config_dir)?;
    let mut policy = config.retry_policies.for_operation(&args.operation).clone();
    if let Some(attempts) = args.attempts {
        policy.max_attempts = attempts;
    }
    if let Some(strategy) = args.strategy {
        policy.strategy = strategy;
    }
    if let Some(initial) = args.initial_delay_ms {
        policy.initial_delay_ms = initial;
    }
    if let Some(max) = args.max_delay_ms {
        policy.max_delay_ms = max;
    }
    policy.validate(&args.operation)?;

    let transient_codes = args.transient_exit_codes.clone();
    let executor = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_predicate(ClosurePredicate::new(move |failure: &RunFailure| {
            is_retryable(failure, &transient_codes)
        }))
        .with_observer(TracingObserver::new(program))
        .build();

    let result = executor
        .execute(|| async {
            match Command::new(program).args(program_args).status().await {
                Ok(status) => check_status(status),
                Err(err) => Err(RunFailure::Spawn(err)),
            }
        })
        .await;

    match result {
        Ok(()) => {
            output::success(&format!("'{}' succeeded", program));
            Ok(())
        }
        Err(RetryError::Exhausted {
            attempts, source, ..
        }) => Err(anyhow!(
            "'{}' still failing after {} attempts: {}",
            program,
            attempts,
            source
        )),
        Err(RetryError::NonRetryable { attempt, source }) => {
            if attempt > 1 {
                output::warning(&format!("Gave up after {} attempts", attempt));
            }
            Err(anyhow!("'{}' {}", program, source))
        }
    }
}
