//! Check command

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use settle_core::check::{CheckError, Checker, PollResult};
use tokio::process::Command;

use super::{load_config, split_command};
use crate::cli::CheckArgs;
use crate::output;

pub async fn run(args: CheckArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let (program, program_args) = split_command(&args.command)?;

    let mut policy = load_config(config_dir)?.check;
    if let Some(attempts) = args.attempts {
        policy.max_attempts = attempts;
    }
    if let Some(delay_ms) = args.delay_ms {
        policy.delay_ms = delay_ms;
    }
    policy.validate()?;

    let checker = Checker::one_of(args.expect.clone())
        .reverse(args.reverse)
        .negate(args.negate)
        .policy(policy)
        .label(program);

    let result = checker
        .try_run_async(|| observe(program, program_args, args.lines))
        .await;

    match result {
        Ok(outcome) => {
            output::success(&format!(
                "Settled after {} attempt(s) in {:.2}s",
                outcome.attempts,
                outcome.elapsed.as_secs_f64()
            ));
            if let Some(value) = outcome.matched.and_then(|i| outcome.observed.iter().nth(i)) {
                output::kv("Matched", value);
            }
            Ok(())
        }
        Err(CheckError::Timeout {
            attempts,
            last_observed,
        }) => Err(anyhow!(
            "'{}' did not settle after {} attempts, last output: {}",
            program,
            attempts,
            describe(&last_observed)
        )),
        Err(CheckError::Getter(err)) => {
            Err(err).with_context(|| format!("Failed to run '{}'", program))
        }
    }
}

/// Run the command once and turn its stdout into an observation
async fn observe(program: &str, args: &[String], lines: bool) -> std::io::Result<PollResult<String>> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .await?;

    tracing::debug!(program, status = %output.status, "command finished");
    Ok(parse_output(&String::from_utf8_lossy(&output.stdout), lines))
}

fn parse_output(stdout: &str, lines: bool) -> PollResult<String> {
    if lines {
        PollResult::Many(
            stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        )
    } else {
        PollResult::Single(stdout.trim().to_string())
    }
}

fn describe(observed: &PollResult<String>) -> String {
    match observed {
        PollResult::Single(value) => format!("{:?}", value),
        PollResult::Many(values) => format!("{:?}", values),
    }
}
