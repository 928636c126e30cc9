use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fallback::AttemptRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    BuildToolNotFound,
    SshIdentityFileNotFound,

    DeployBuildFailed,
    DeployArtifactNotFound,
    DeployTransferFailed,
    DeployRemoteExecutionFailed,

    RunInterrupted,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::BuildToolNotFound => "build.tool_not_found",
            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",

            ErrorCode::DeployBuildFailed => "deploy.build_failed",
            ErrorCode::DeployArtifactNotFound => "deploy.artifact_not_found",
            ErrorCode::DeployTransferFailed => "deploy.transfer_failed",
            ErrorCode::DeployRemoteExecutionFailed => "deploy.remote_execution_failed",

            ErrorCode::RunInterrupted => "run.interrupted",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildToolNotFoundDetails {
    pub tool: String,
    pub working_dir: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailedDetails {
    pub tool: String,
    pub args: Vec<String>,
    pub working_dir: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_tail: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactNotFoundDetails {
    pub directory: String,
    pub pattern: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackExhaustedDetails {
    pub target: String,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub identity_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        let message = format!("Missing required configuration key '{}'", key);
        Self::new(
            ErrorCode::ConfigMissingKey,
            message,
            to_details(ConfigMissingKeyDetails { key, path }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let problem = problem.into();
        let message = format!("Invalid configuration value for '{}': {}", key, problem);
        Self::new(
            ErrorCode::ConfigInvalidValue,
            message,
            to_details(ConfigInvalidValueDetails {
                key,
                value,
                problem,
            }),
        )
    }

    pub fn build_tool_not_found(tool: impl Into<String>, working_dir: impl Into<String>) -> Self {
        let tool = tool.into();
        let message = format!("Build tool not found: {}", tool);
        Self::new(
            ErrorCode::BuildToolNotFound,
            message,
            to_details(BuildToolNotFoundDetails {
                tool,
                working_dir: working_dir.into(),
            }),
        )
        .with_hint("Make sure the build tool is installed")
        .with_hint("Set buildTool in jarlift.json or JARLIFT_BUILD_TOOL to its full path")
        .with_hint("Or add the build tool's bin directory to PATH")
    }

    pub fn build_failed(details: BuildFailedDetails) -> Self {
        let message = format!(
            "Build failed (exit code {}). Check the code for compile errors",
            details.exit_code
        );
        let hint = match details.exit_code {
            127 => Some("Command not found. Check that the build tool and its dependencies are installed and in PATH"),
            126 => Some("Permission denied. Check file permissions on the build tool"),
            _ => None,
        };

        let err = Self::new(ErrorCode::DeployBuildFailed, message, to_details(details));
        match hint {
            Some(h) => err.with_hint(h),
            None => err,
        }
    }

    pub fn artifact_not_found(directory: impl Into<String>, pattern: impl Into<String>) -> Self {
        let directory = directory.into();
        let pattern = pattern.into();
        let message = format!("No artifact matching '{}' in {}", pattern, directory);
        Self::new(
            ErrorCode::DeployArtifactNotFound,
            message,
            to_details(ArtifactNotFoundDetails { directory, pattern }),
        )
        .with_hint("Check that the build produces a package into outputDir")
        .with_hint("Adjust artifactPattern if the package is named differently")
    }

    pub fn transfer_failed(target: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        let message = format!(
            "Upload failed: all {} transfer mechanism(s) exhausted ({})",
            attempts.len(),
            summarize_attempts(&attempts)
        );
        Self::new(
            ErrorCode::DeployTransferFailed,
            message,
            to_details(FallbackExhaustedDetails {
                target: target.into(),
                attempts,
            }),
        )
        .with_hint("Check network connectivity and the server configuration")
        .with_hint("Install PuTTY (pscp/plink) from https://www.putty.org/")
        .with_hint("Or install sshpass (e.g. 'apt install sshpass' on Linux/WSL)")
        .with_hint("Or configure SSH key authentication (identityFile)")
    }

    pub fn remote_execution_failed(target: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        let message = format!(
            "Remote deploy command failed: all {} remote-shell mechanism(s) exhausted ({})",
            attempts.len(),
            summarize_attempts(&attempts)
        );
        Self::new(
            ErrorCode::DeployRemoteExecutionFailed,
            message,
            to_details(FallbackExhaustedDetails {
                target: target.into(),
                attempts,
            }),
        )
        .with_hint("Check that the deploy script exists in remotePath and runs on the server")
        .with_hint("Check network connectivity and SSH credentials")
    }

    pub fn ssh_identity_file_not_found(identity_file: impl Into<String>) -> Self {
        let identity_file = identity_file.into();
        let message = format!("SSH identity file not found: {}", identity_file);
        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            message,
            to_details(SshIdentityFileNotFoundDetails { identity_file }),
        )
    }

    pub fn interrupted(stage: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RunInterrupted,
            "Deployment interrupted by user",
            serde_json::json!({ "stage": stage.into() }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            format!("Unexpected error: {}", error),
            serde_json::json!({ "error": error }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

fn summarize_attempts(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "no mechanisms configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.tool, a.outcome.short()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::AttemptOutcome;

    #[test]
    fn codes_are_dotted() {
        assert_eq!(ErrorCode::DeployTransferFailed.as_str(), "deploy.transfer_failed");
        assert_eq!(ErrorCode::RunInterrupted.as_str(), "run.interrupted");
    }

    #[test]
    fn transfer_failed_lists_every_attempt() {
        let err = Error::transfer_failed(
            "root@example.com:/srv/app/",
            vec![
                AttemptRecord::new("pscp", AttemptOutcome::Missing),
                AttemptRecord::new(
                    "scp",
                    AttemptOutcome::Failed {
                        exit_code: 1,
                        stderr: "Permission denied".to_string(),
                    },
                ),
            ],
        );

        assert!(err.message.contains("pscp: not installed"));
        assert!(err.message.contains("scp: exit code 1"));
        let attempts = err.details["attempts"].as_array().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1]["outcome"]["stderr"], "Permission denied");
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn build_failed_adds_posix_hint_for_127() {
        let err = Error::build_failed(BuildFailedDetails {
            tool: "mvn".to_string(),
            args: vec!["clean".to_string()],
            working_dir: ".".to_string(),
            exit_code: 127,
            output_tail: String::new(),
        });
        assert_eq!(err.code, ErrorCode::DeployBuildFailed);
        assert!(err.hints[0].message.contains("Command not found"));
    }
}
