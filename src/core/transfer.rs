//! Upload the artifact to the remote directory.
//!
//! Mechanisms that can supply a password without prompting come first;
//! plain `scp` is the last resort and may ask the operator for one.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::DeployConfig;
use crate::credential::{self, Credential};
use crate::error::{Error, Result};
use crate::fallback::{self, AttemptRecord, ChainOutcome, Mechanism, Prepared};
use crate::interrupt::Interrupt;
use crate::runner::{CommandRunner, Invocation, StdioMode};
use crate::ssh::{self, OpenSshTool};

pub const STAGE: &str = "transfer";

pub struct TransferRequest<'a> {
    pub artifact: &'a Path,
    pub config: &'a DeployConfig,
    pub credential: &'a Credential,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutput {
    pub artifact: PathBuf,
    pub target: String,
    pub tool: String,
    pub attempts: Vec<AttemptRecord>,
}

/// `pscp` with the password read from a temporary file.
pub struct Pscp;

impl Mechanism<TransferRequest<'_>> for Pscp {
    fn name(&self) -> &'static str {
        "pscp"
    }

    fn description(&self) -> &'static str {
        "pscp (password supplied automatically)"
    }

    fn prepare(&self, request: &TransferRequest<'_>) -> Result<Prepared> {
        let Some(secret) = request.credential.password() else {
            return Ok(Prepared::Skip("no password available".to_string()));
        };
        let pw_file = credential::password_file(secret)?;
        let pw_path = pw_file.to_string_lossy().to_string();

        Ok(Prepared::Run(
            Invocation::new("pscp")
                .args(ssh::putty_args(request.config, &pw_path))
                .arg(request.artifact.to_string_lossy())
                .arg(request.config.upload_target())
                .guard(pw_file),
        ))
    }
}

/// `sshpass -e scp` with the password in `SSHPASS`.
pub struct SshpassScp;

impl Mechanism<TransferRequest<'_>> for SshpassScp {
    fn name(&self) -> &'static str {
        "sshpass"
    }

    fn description(&self) -> &'static str {
        "sshpass + scp (password supplied automatically)"
    }

    fn prepare(&self, request: &TransferRequest<'_>) -> Result<Prepared> {
        let Some(secret) = request.credential.password() else {
            return Ok(Prepared::Skip("no password available".to_string()));
        };

        Ok(Prepared::Run(
            Invocation::new("sshpass")
                .args(["-e", "scp"])
                .args(ssh::openssh_args(request.config, OpenSshTool::Scp))
                .arg(request.artifact.to_string_lossy())
                .arg(request.config.upload_target())
                .env("SSHPASS", secret.expose()),
        ))
    }
}

/// Plain `scp`, attached to the terminal.
pub struct Scp;

impl Mechanism<TransferRequest<'_>> for Scp {
    fn name(&self) -> &'static str {
        "scp"
    }

    fn description(&self) -> &'static str {
        "scp (may prompt for a password if no SSH key is configured)"
    }

    fn prepare(&self, request: &TransferRequest<'_>) -> Result<Prepared> {
        Ok(Prepared::Run(
            Invocation::new("scp")
                .args(ssh::openssh_args(request.config, OpenSshTool::Scp))
                .arg(request.artifact.to_string_lossy())
                .arg(request.config.upload_target())
                .stdio(StdioMode::Inherited),
        ))
    }
}

/// Default chain, highest priority first.
pub fn mechanisms<'a>() -> Vec<Box<dyn Mechanism<TransferRequest<'a>>>> {
    vec![Box::new(Pscp), Box::new(SshpassScp), Box::new(Scp)]
}

pub fn upload(
    request: &TransferRequest<'_>,
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
) -> Result<TransferOutput> {
    upload_with(request, &mechanisms(), runner, interrupt)
}

pub fn upload_with<'a>(
    request: &TransferRequest<'a>,
    mechanisms: &[Box<dyn Mechanism<TransferRequest<'a>>>],
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
) -> Result<TransferOutput> {
    let target = request.config.upload_target();
    log_status!(
        STAGE,
        "Uploading {} to {}",
        request.artifact.display(),
        target
    );

    match fallback::run_chain(STAGE, mechanisms, request, runner, interrupt)? {
        ChainOutcome::Succeeded(success) => {
            log_status!(STAGE, "Upload succeeded via {}", success.tool);
            Ok(TransferOutput {
                artifact: request.artifact.to_path_buf(),
                target,
                tool: success.tool,
                attempts: success.attempts,
            })
        }
        ChainOutcome::Exhausted(attempts) => Err(Error::transfer_failed(target, attempts)),
    }
}
