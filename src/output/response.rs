//! CLI response formatting and output.
//!
//! Provides the JSON envelope, the human-readable error report, and exit code mapping.

use jarlift::error::Hint;
use jarlift::fallback::{AttemptOutcome, AttemptRecord};
use jarlift::{Error, ErrorCode, Result};
use serde::Serialize;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

/// Every failure maps to exit code 1; callers only need success vs. failure.
pub fn exit_code_for_error(_code: ErrorCode) -> i32 {
    EXIT_FAILURE
}

/// Emit a command result in the selected mode and return the process exit code.
///
/// Human mode prints nothing on success (commands report their own progress)
/// and a readable report on stderr for errors.
pub fn finish<T: Serialize>(result: Result<T>, json: bool) -> i32 {
    match result {
        Ok(data) => {
            if json {
                if let Err(e) = print_response(&CliResponse::success(data)) {
                    eprintln!("{}", render_error(&e));
                    return EXIT_FAILURE;
                }
            }
            EXIT_SUCCESS
        }
        Err(err) => {
            if json {
                if print_response(&CliResponse::<()>::from_error(&err)).is_err() {
                    eprintln!("{}", render_error(&err));
                }
            } else {
                eprintln!("{}", render_error(&err));
            }
            exit_code_for_error(err.code)
        }
    }
}

/// Human-readable error report: message, captured diagnostics, per-tool attempts, hints.
pub fn render_error(err: &Error) -> String {
    let mut out = format!("Error [{}]: {}", err.code.as_str(), err.message);

    if let Some(tail) = err
        .details
        .get("outputTail")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
    {
        out.push_str("\n\nLast build output:\n");
        for line in tail.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }

    if let Some(attempts) = err.details.get("attempts") {
        if let Ok(attempts) = serde_json::from_value::<Vec<AttemptRecord>>(attempts.clone()) {
            if !attempts.is_empty() {
                out.push_str("\n\nAttempts:");
                for attempt in &attempts {
                    out.push_str(&format!("\n  {}: {}", attempt.tool, attempt.outcome.short()));
                    if let AttemptOutcome::Failed { stderr, .. } = &attempt.outcome {
                        if let Some(line) = stderr.lines().find(|l| !l.trim().is_empty()) {
                            out.push_str(&format!("\n      {}", line.trim()));
                        }
                    }
                }
            }
        }
    }

    if !err.hints.is_empty() {
        out.push_str("\n\nHints:");
        for hint in &err.hints {
            out.push_str(&format!("\n  - {}", hint.message));
        }
    }

    out
}
