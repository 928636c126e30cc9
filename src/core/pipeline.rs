//! The deployment pipeline: Clean → Build → Locate → Transfer → Deploy.
//!
//! Stages run strictly in order. Any stage failure moves the machine to
//! `Failed` and stops the run; `Done` and `Failed` are terminal.

use serde::Serialize;

use crate::artifact::{self, Artifact};
use crate::build::{self, BuildOutput};
use crate::cleanup::{self, CleanupOutput};
use crate::config::DeployConfig;
use crate::credential::Credential;
use crate::error::{Error, ErrorCode, Result};
use crate::fallback::AttemptRecord;
use crate::interrupt::Interrupt;
use crate::remote::{self, RemoteOutput, RemoteRequest};
use crate::runner::CommandRunner;
use crate::transfer::{self, TransferOutput, TransferRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Clean,
    Build,
    Locate,
    Transfer,
    Deploy,
    Done,
    Failed,
}

impl Stage {
    /// Stages that do work, in execution order.
    pub const WORK: [Stage; 5] = [
        Stage::Clean,
        Stage::Build,
        Stage::Locate,
        Stage::Transfer,
        Stage::Deploy,
    ];

    /// Successor on success. Terminal states have none.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Clean => Some(Stage::Build),
            Stage::Build => Some(Stage::Locate),
            Stage::Locate => Some(Stage::Transfer),
            Stage::Transfer => Some(Stage::Deploy),
            Stage::Deploy => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Clean => cleanup::STAGE,
            Stage::Build => build::STAGE,
            Stage::Locate => artifact::STAGE,
            Stage::Transfer => transfer::STAGE,
            Stage::Deploy => remote::STAGE,
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Clean => "Cleaning old build files",
            Stage::Build => "Building package",
            Stage::Locate => "Locating artifact",
            Stage::Transfer => "Uploading artifact to server",
            Stage::Deploy => "Running deploy command on server",
            Stage::Done => "Done",
            Stage::Failed => "Failed",
        }
    }

    /// 1-based position among the work stages.
    pub fn number(self) -> Option<usize> {
        Stage::WORK.iter().position(|s| *s == self).map(|i| i + 1)
    }

    /// Whether a failure here should wait for operator acknowledgment.
    /// Cleanup never blocks the run, so only later stages qualify.
    pub fn pauses_on_failure(self) -> bool {
        matches!(
            self,
            Stage::Build | Stage::Locate | Stage::Transfer | Stage::Deploy
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Forward-only state machine over [`Stage`].
#[derive(Debug, Clone)]
pub struct StageMachine {
    current: Stage,
}

impl Default for StageMachine {
    fn default() -> Self {
        Self {
            current: Stage::Clean,
        }
    }
}

impl StageMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Move to the next stage after a success.
    pub fn advance(&mut self) -> Result<Stage> {
        let next = self.current.next().ok_or_else(|| {
            Error::internal_unexpected(format!(
                "cannot advance from terminal stage '{}'",
                self.current
            ))
        })?;
        self.current = next;
        Ok(next)
    }

    /// Move to `Failed`. Returns the stage that failed.
    pub fn fail(&mut self) -> Stage {
        let failed_at = self.current;
        self.current = Stage::Failed;
        failed_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub message: String,
    /// Fallback attempts, for stages that run a tool chain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
}

/// What a successful stage reports.
struct StageSummary {
    message: String,
    attempts: Vec<AttemptRecord>,
}

impl StageSummary {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub state: Stage,
    pub stages: Vec<StageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<RemoteOutput>,
    pub app_url: String,
}

impl PipelineReport {
    fn new(app_url: String) -> Self {
        Self {
            state: Stage::Clean,
            stages: Vec::new(),
            cleanup: None,
            build: None,
            artifact: None,
            transfer: None,
            deploy: None,
            app_url,
        }
    }

    fn record(
        &mut self,
        stage: Stage,
        status: StageStatus,
        message: impl Into<String>,
        attempts: Vec<AttemptRecord>,
    ) {
        self.stages.push(StageRecord {
            stage,
            status,
            message: message.into(),
            attempts,
        });
    }

    /// Stages that actually ran, in order.
    pub fn executed(&self) -> Vec<Stage> {
        self.stages.iter().map(|r| r.stage).collect()
    }
}

/// A run that ended in `Failed`, with everything gathered before the failure.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: Error,
    pub report: PipelineReport,
}

impl PipelineFailure {
    pub fn is_interrupt(&self) -> bool {
        self.error.code == ErrorCode::RunInterrupted
    }

    /// Operator pause applies to stage failures after cleanup, never to interrupts.
    pub fn wants_acknowledgment(&self) -> bool {
        !self.is_interrupt() && self.stage.pauses_on_failure()
    }
}

pub struct Pipeline<'a> {
    pub config: &'a DeployConfig,
    pub credential: &'a Credential,
    pub runner: &'a dyn CommandRunner,
    pub interrupt: &'a Interrupt,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a DeployConfig,
        credential: &'a Credential,
        runner: &'a dyn CommandRunner,
        interrupt: &'a Interrupt,
    ) -> Self {
        Self {
            config,
            credential,
            runner,
            interrupt,
        }
    }

    pub fn run(&self) -> std::result::Result<PipelineReport, PipelineFailure> {
        let mut machine = StageMachine::new();
        let mut report = PipelineReport::new(self.config.app_url());

        while !machine.current().is_terminal() {
            let stage = machine.current();
            report.state = stage;

            let outcome = self
                .interrupt
                .check(stage.as_str())
                .and_then(|()| {
                    if let Some(n) = stage.number() {
                        log_status!(
                            "pipeline",
                            "Step {}/{}: {}...",
                            n,
                            Stage::WORK.len(),
                            stage.label()
                        );
                    }
                    self.run_stage(stage, &mut report)
                });

            match outcome {
                Ok(summary) => {
                    report.record(
                        stage,
                        StageStatus::Succeeded,
                        summary.message,
                        summary.attempts,
                    );
                    if let Err(error) = machine.advance() {
                        return Err(self.fail(&mut machine, error, report));
                    }
                }
                Err(error) => return Err(self.fail(&mut machine, error, report)),
            }
        }

        report.state = machine.current();
        Ok(report)
    }

    fn fail(
        &self,
        machine: &mut StageMachine,
        error: Error,
        mut report: PipelineReport,
    ) -> PipelineFailure {
        let stage = machine.fail();
        let attempts = error
            .details
            .get("attempts")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        report.record(stage, StageStatus::Failed, error.message.clone(), attempts);
        report.state = machine.current();
        if error.code == ErrorCode::RunInterrupted {
            log_status!("pipeline", "Deployment interrupted by user");
        }
        PipelineFailure {
            stage,
            error,
            report,
        }
    }

    /// Run one work stage, storing its output in `report`.
    fn run_stage(&self, stage: Stage, report: &mut PipelineReport) -> Result<StageSummary> {
        let config = self.config;

        match stage {
            Stage::Clean => match cleanup::clean(&config.output_path(), &config.clean_pattern) {
                Ok(out) => {
                    let summary = StageSummary::new(out.summary());
                    report.cleanup = Some(out);
                    Ok(summary)
                }
                Err(e) => {
                    log_status!(cleanup::STAGE, "Cleanup skipped: {}", e);
                    Ok(StageSummary::new(format!("Cleanup skipped: {}", e)))
                }
            },
            Stage::Build => {
                let out = build::run(config, self.runner, self.interrupt)?;
                let summary = StageSummary::new(format!("Built with {}", out.tool));
                report.build = Some(out);
                Ok(summary)
            }
            Stage::Locate => {
                let found = artifact::locate(&config.output_path(), &config.artifact_pattern)?;
                let summary = StageSummary::new(format!("Found {}", found.file_name));
                report.artifact = Some(found);
                Ok(summary)
            }
            Stage::Transfer => {
                let artifact_path = report
                    .artifact
                    .as_ref()
                    .map(|a| a.path.clone())
                    .ok_or_else(|| Error::internal_unexpected("transfer reached without an artifact"))?;
                let request = TransferRequest {
                    artifact: &artifact_path,
                    config,
                    credential: self.credential,
                };
                let out = transfer::upload(&request, self.runner, self.interrupt)?;
                let summary = StageSummary {
                    message: format!("Uploaded via {}", out.tool),
                    attempts: out.attempts.clone(),
                };
                report.transfer = Some(out);
                Ok(summary)
            }
            Stage::Deploy => {
                let request = RemoteRequest {
                    command: remote::deploy_command(config),
                    config,
                    credential: self.credential,
                };
                let out = remote::execute(&request, self.runner, self.interrupt)?;
                let summary = StageSummary {
                    message: format!("Deploy command ran via {}", out.tool),
                    attempts: out.attempts.clone(),
                };
                report.deploy = Some(out);
                Ok(summary)
            }
            Stage::Done | Stage::Failed => Err(Error::internal_unexpected(format!(
                "'{}' is not a work stage",
                stage
            ))),
        }
    }
}
