//! External process execution behind a trait seam.
//!
//! Every stage that shells out goes through [`CommandRunner`], so the
//! pipeline can be driven by canned results in tests without spawning
//! processes.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tempfile::TempPath;

use crate::utils::command::CapturedOutput;

/// How a child process's stdio is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// stdout/stderr are captured for diagnostics.
    Captured,
    /// stdin/stdout/stderr are inherited so the tool can prompt the operator.
    Inherited,
}

/// A single external command to run.
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables. Values may be secrets and are never printed.
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    pub stdio: StdioMode,
    /// Temporary files that must outlive the child process (e.g. password files).
    pub guards: Vec<TempPath>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
            stdio: StdioMode::Captured,
            guards: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdio(mut self, mode: StdioMode) -> Self {
        self.stdio = mode;
        self
    }

    pub fn guard(mut self, path: TempPath) -> Self {
        self.guards.push(path);
        self
    }

    /// Human-readable command line. Environment values are omitted.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_keys)
            .field("current_dir", &self.current_dir)
            .field("stdio", &self.stdio)
            .finish()
    }
}

/// Result of a process that was started and ran to completion.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub output: CapturedOutput,
    pub success: bool,
    pub exit_code: i32,
}

/// Why a process could not produce a [`CommandOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The executable does not exist or is not on PATH.
    NotFound,
    /// Spawning or waiting failed for another reason.
    Io(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::NotFound => write!(f, "executable not found"),
            RunError::Io(e) => write!(f, "{}", e),
        }
    }
}

pub trait CommandRunner {
    /// Run `invocation` to completion, blocking until the child exits.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }

        match invocation.stdio {
            StdioMode::Captured => {
                cmd.stdin(Stdio::null());
                let out = cmd.output().map_err(map_spawn_error)?;
                Ok(CommandOutput {
                    output: CapturedOutput::from_bytes(&out.stdout, &out.stderr),
                    success: out.status.success(),
                    exit_code: out.status.code().unwrap_or(-1),
                })
            }
            StdioMode::Inherited => {
                let status = cmd
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(map_spawn_error)?;
                Ok(CommandOutput {
                    output: CapturedOutput::default(),
                    success: status.success(),
                    exit_code: status.code().unwrap_or(-1),
                })
            }
        }
    }
}

fn map_spawn_error(err: io::Error) -> RunError {
    match err.kind() {
        io::ErrorKind::NotFound => RunError::NotFound,
        _ => RunError::Io(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_maps_to_not_found() {
        let inv = Invocation::new("jarlift_nonexistent_command_xyz");
        assert_eq!(SystemRunner.run(&inv).unwrap_err(), RunError::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_exit_code() {
        let inv = Invocation::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]);
        let out = SystemRunner.run(&inv).unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.output.stdout.trim(), "hello");
        assert_eq!(out.output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn passes_env_and_current_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let inv = Invocation::new("sh")
            .args(["-c", "printf '%s' \"$JARLIFT_TEST_VALUE\"; pwd"])
            .env("JARLIFT_TEST_VALUE", "v1")
            .current_dir(dir.path());
        let out = SystemRunner.run(&inv).unwrap();
        assert!(out.success);
        assert!(out.output.stdout.starts_with("v1"));
    }

    #[test]
    fn debug_hides_env_values() {
        let inv = Invocation::new("sshpass").env("SSHPASS", "hunter2");
        let rendered = format!("{:?}", inv);
        assert!(rendered.contains("SSHPASS"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("mvn").args(["clean", "package"]);
        assert_eq!(inv.display(), "mvn clean package");
    }
}
