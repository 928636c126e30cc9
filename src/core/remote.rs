//! Run the deploy script on the remote host.

use serde::Serialize;

use crate::config::DeployConfig;
use crate::credential::{self, Credential};
use crate::error::{Error, Result};
use crate::fallback::{self, AttemptRecord, ChainOutcome, Mechanism, Prepared};
use crate::interrupt::Interrupt;
use crate::runner::{CommandRunner, Invocation, StdioMode};
use crate::ssh::{self, OpenSshTool};
use crate::utils::command::CapturedOutput;
use crate::utils::shell;

pub const STAGE: &str = "deploy";

pub struct RemoteRequest<'a> {
    pub command: String,
    pub config: &'a DeployConfig,
    pub credential: &'a Credential,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOutput {
    pub command: String,
    pub target: String,
    pub tool: String,
    #[serde(skip_serializing_if = "CapturedOutput::is_empty")]
    pub output: CapturedOutput,
    pub attempts: Vec<AttemptRecord>,
}

/// `cd <remote_path> && chmod +x <script> && sh <script> <subcommand>`
pub fn deploy_command(config: &DeployConfig) -> String {
    let script = shell::quote_arg(&config.deploy_script);
    shell::and_chain(&[
        format!("cd {}", shell::quote_arg(&config.remote_path)),
        format!("chmod +x {}", script),
        format!(
            "sh {} {}",
            script,
            shell::quote_arg(&config.deploy_subcommand)
        ),
    ])
}

/// `plink` with the password read from a temporary file.
pub struct Plink;

impl Mechanism<RemoteRequest<'_>> for Plink {
    fn name(&self) -> &'static str {
        "plink"
    }

    fn description(&self) -> &'static str {
        "plink (password supplied automatically)"
    }

    fn prepare(&self, request: &RemoteRequest<'_>) -> Result<Prepared> {
        let Some(secret) = request.credential.password() else {
            return Ok(Prepared::Skip("no password available".to_string()));
        };
        let pw_file = credential::password_file(secret)?;
        let pw_path = pw_file.to_string_lossy().to_string();

        Ok(Prepared::Run(
            Invocation::new("plink")
                .args(ssh::putty_args(request.config, &pw_path))
                .arg(request.config.destination())
                .arg(request.command.clone())
                .guard(pw_file),
        ))
    }
}

/// `sshpass -e ssh` with the password in `SSHPASS`.
pub struct SshpassSsh;

impl Mechanism<RemoteRequest<'_>> for SshpassSsh {
    fn name(&self) -> &'static str {
        "sshpass"
    }

    fn description(&self) -> &'static str {
        "sshpass + ssh (password supplied automatically)"
    }

    fn prepare(&self, request: &RemoteRequest<'_>) -> Result<Prepared> {
        let Some(secret) = request.credential.password() else {
            return Ok(Prepared::Skip("no password available".to_string()));
        };

        Ok(Prepared::Run(
            Invocation::new("sshpass")
                .args(["-e", "ssh"])
                .args(ssh::openssh_args(request.config, OpenSshTool::Ssh))
                .arg(request.config.destination())
                .arg(request.command.clone())
                .env("SSHPASS", secret.expose()),
        ))
    }
}

/// Plain `ssh`, attached to the terminal.
pub struct Ssh;

impl Mechanism<RemoteRequest<'_>> for Ssh {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn description(&self) -> &'static str {
        "ssh (may prompt for a password if no SSH key is configured)"
    }

    fn prepare(&self, request: &RemoteRequest<'_>) -> Result<Prepared> {
        Ok(Prepared::Run(
            Invocation::new("ssh")
                .args(ssh::openssh_args(request.config, OpenSshTool::Ssh))
                .arg(request.config.destination())
                .arg(request.command.clone())
                .stdio(StdioMode::Inherited),
        ))
    }
}

/// Default chain, highest priority first.
pub fn mechanisms<'a>() -> Vec<Box<dyn Mechanism<RemoteRequest<'a>>>> {
    vec![Box::new(Plink), Box::new(SshpassSsh), Box::new(Ssh)]
}

pub fn execute(
    request: &RemoteRequest<'_>,
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
) -> Result<RemoteOutput> {
    execute_with(request, &mechanisms(), runner, interrupt)
}

pub fn execute_with<'a>(
    request: &RemoteRequest<'a>,
    mechanisms: &[Box<dyn Mechanism<RemoteRequest<'a>>>],
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
) -> Result<RemoteOutput> {
    let target = request.config.destination();
    log_status!(STAGE, "Running '{}' on {}", request.command, target);

    match fallback::run_chain(STAGE, mechanisms, request, runner, interrupt)? {
        ChainOutcome::Succeeded(success) => {
            for line in success.output.stdout.lines() {
                log_status!("remote", "{}", line);
            }
            log_status!(STAGE, "Remote deploy command succeeded via {}", success.tool);
            Ok(RemoteOutput {
                command: request.command.clone(),
                target,
                tool: success.tool,
                output: success.output,
                attempts: success.attempts,
            })
        }
        ChainOutcome::Exhausted(attempts) => Err(Error::remote_execution_failed(target, attempts)),
    }
}
