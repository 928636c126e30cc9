//! Ordered fallback across interchangeable external tools.
//!
//! A chain is a prioritized list of [`Mechanism`]s. Each one is prepared
//! against the request and run; the first success ends the chain. A
//! missing executable, a non-zero exit, or an inapplicable mechanism
//! (skipped) moves on to the next entry. Nothing is retried.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::runner::{CommandRunner, Invocation, RunError};
use crate::utils::command::CapturedOutput;

/// What a mechanism needs to do for a given request.
pub enum Prepared {
    Run(Invocation),
    /// The mechanism cannot be used for this request (e.g. no password).
    Skip(String),
}

/// One entry of a fallback chain.
pub trait Mechanism<R: ?Sized> {
    /// Executable name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Short operator-facing description, e.g. "pscp (password supplied automatically)".
    fn description(&self) -> &'static str;

    fn prepare(&self, request: &R) -> Result<Prepared>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Missing,
    #[serde(rename_all = "camelCase")]
    Failed {
        exit_code: i32,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        stderr: String,
    },
    Skipped {
        reason: String,
    },
    SpawnFailed {
        error: String,
    },
}

impl AttemptOutcome {
    pub fn short(&self) -> String {
        match self {
            AttemptOutcome::Succeeded => "succeeded".to_string(),
            AttemptOutcome::Missing => "not installed".to_string(),
            AttemptOutcome::Failed { exit_code, .. } => format!("exit code {}", exit_code),
            AttemptOutcome::Skipped { reason } => format!("skipped ({})", reason),
            AttemptOutcome::SpawnFailed { error } => format!("could not start ({})", error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub tool: String,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn new(tool: impl Into<String>, outcome: AttemptOutcome) -> Self {
        Self {
            tool: tool.into(),
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainSuccess {
    pub tool: String,
    pub output: CapturedOutput,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
pub enum ChainOutcome {
    Succeeded(ChainSuccess),
    Exhausted(Vec<AttemptRecord>),
}

/// Try each mechanism in order until one succeeds.
///
/// Only an operator interrupt produces `Err`; tool failures are reported
/// through [`ChainOutcome::Exhausted`].
pub fn run_chain<R: ?Sized>(
    stage: &str,
    mechanisms: &[Box<dyn Mechanism<R>>],
    request: &R,
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
) -> Result<ChainOutcome> {
    let mut attempts = Vec::with_capacity(mechanisms.len());

    for mechanism in mechanisms {
        interrupt.check(stage)?;

        let invocation = match mechanism.prepare(request) {
            Ok(Prepared::Run(invocation)) => invocation,
            Ok(Prepared::Skip(reason)) => {
                log_status!(stage, "Skipping {}: {}", mechanism.name(), reason);
                attempts.push(AttemptRecord::new(
                    mechanism.name(),
                    AttemptOutcome::Skipped { reason },
                ));
                continue;
            }
            Err(e) => {
                log_status!(stage, "Could not prepare {}: {}", mechanism.name(), e);
                attempts.push(AttemptRecord::new(
                    mechanism.name(),
                    AttemptOutcome::SpawnFailed {
                        error: e.to_string(),
                    },
                ));
                continue;
            }
        };

        log_status!(stage, "Using {}", mechanism.description());
        let result = runner.run(&invocation);
        interrupt.check(stage)?;

        let outcome = match result {
            Ok(out) if out.success => {
                attempts.push(AttemptRecord::new(mechanism.name(), AttemptOutcome::Succeeded));
                return Ok(ChainOutcome::Succeeded(ChainSuccess {
                    tool: mechanism.name().to_string(),
                    output: out.output,
                    attempts,
                }));
            }
            Ok(out) => {
                let stderr = out.output.error_text();
                log_status!(
                    stage,
                    "{} failed (exit code {}){}",
                    mechanism.name(),
                    out.exit_code,
                    if stderr.is_empty() {
                        String::new()
                    } else {
                        format!(": {}", stderr)
                    }
                );
                AttemptOutcome::Failed {
                    exit_code: out.exit_code,
                    stderr,
                }
            }
            Err(RunError::NotFound) => {
                log_status!(stage, "{} not found", mechanism.name());
                AttemptOutcome::Missing
            }
            Err(RunError::Io(error)) => {
                log_status!(stage, "{} could not be started: {}", mechanism.name(), error);
                AttemptOutcome::SpawnFailed { error }
            }
        };

        attempts.push(AttemptRecord::new(mechanism.name(), outcome));
    }

    Ok(ChainOutcome::Exhausted(attempts))
}
