use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::DeployConfig;
use crate::error::{BuildFailedDetails, Error, Result};
use crate::interrupt::Interrupt;
use crate::runner::{CommandRunner, Invocation, RunError};
use crate::utils::command::tail_lines;

pub const STAGE: &str = "build";

/// Lines of build output kept for diagnostics.
const OUTPUT_TAIL_LINES: usize = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub tool: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub exit_code: i32,
}

/// Program to spawn for the build.
///
/// A bare name is returned as-is for PATH lookup. A relative path such as
/// `./mvnw` is taken from `project_dir`, where the build runs, and made
/// absolute so spawning does not depend on the caller's working directory.
pub fn resolve_tool(config: &DeployConfig) -> String {
    if !config.build_tool_is_path() {
        return config.build_tool.clone();
    }

    let tool = Path::new(&config.build_tool);
    if tool.is_absolute() {
        return config.build_tool.clone();
    }

    let joined = config.project_dir.join(tool);
    let absolute = if joined.is_absolute() {
        joined
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(joined),
            Err(_) => joined,
        }
    };
    absolute.display().to_string()
}

/// Check the build tool before running it.
///
/// A bare name is left for PATH resolution at spawn time; a path must exist.
pub fn validate_tool(config: &DeployConfig) -> Result<()> {
    if config.build_tool_is_path() && !Path::new(&resolve_tool(config)).exists() {
        return Err(Error::build_tool_not_found(
            &config.build_tool,
            config.project_dir.display().to_string(),
        ));
    }
    Ok(())
}

/// Run the configured build (by default `mvn clean package -DskipTests`).
///
/// Fails fast: no retries, since a compile error needs a developer.
pub fn run(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
) -> Result<BuildOutput> {
    validate_tool(config)?;

    if !config.project_dir.is_dir() {
        return Err(Error::config_invalid_value(
            "projectDir",
            Some(config.project_dir.display().to_string()),
            "directory does not exist",
        ));
    }

    log_status!(STAGE, "Using build tool: {}", config.build_tool);

    let invocation = Invocation::new(resolve_tool(config))
        .args(config.build_args.iter().cloned())
        .current_dir(&config.project_dir);

    log_status!(STAGE, "Running: {}", invocation.display());
    let result = runner.run(&invocation);
    interrupt.check(STAGE)?;

    let out = match result {
        Ok(out) => out,
        Err(RunError::NotFound) => {
            return Err(Error::build_tool_not_found(
                &config.build_tool,
                config.project_dir.display().to_string(),
            ))
        }
        Err(RunError::Io(e)) => {
            return Err(Error::internal_io(
                e,
                Some(format!("run {}", config.build_tool)),
            ))
        }
    };

    if !out.success {
        let output_tail = tail_lines(&out.output.error_text(), OUTPUT_TAIL_LINES);
        log_status!(STAGE, "Build failed (exit code {})", out.exit_code);
        return Err(Error::build_failed(BuildFailedDetails {
            tool: config.build_tool.clone(),
            args: config.build_args.clone(),
            working_dir: config.project_dir.display().to_string(),
            exit_code: out.exit_code,
            output_tail,
        }));
    }

    log_status!(STAGE, "Build succeeded");

    Ok(BuildOutput {
        tool: config.build_tool.clone(),
        args: config.build_args.clone(),
        working_dir: config.project_dir.clone(),
        exit_code: out.exit_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::runner::CommandOutput;
    use crate::utils::command::CapturedOutput;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    struct Fixed {
        result: std::result::Result<CommandOutput, RunError>,
        calls: Cell<usize>,
        program: RefCell<Option<String>>,
    }

    impl Fixed {
        fn new(result: std::result::Result<CommandOutput, RunError>) -> Self {
            Self {
                result,
                calls: Cell::new(0),
                program: RefCell::new(None),
            }
        }
    }

    impl CommandRunner for Fixed {
        fn run(&self, inv: &Invocation) -> std::result::Result<CommandOutput, RunError> {
            self.calls.set(self.calls.get() + 1);
            *self.program.borrow_mut() = Some(inv.program.clone());
            self.result.clone()
        }
    }

    fn succeeded() -> std::result::Result<CommandOutput, RunError> {
        Ok(CommandOutput {
            success: true,
            ..Default::default()
        })
    }

    fn config_in(dir: &Path) -> DeployConfig {
        DeployConfig {
            host: "h".to_string(),
            project_dir: dir.to_path_buf(),
            build_tool: "mvn".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_tool_path_fails_before_spawning() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        config.build_tool = dir.path().join("bin/mvn").display().to_string();
        let runner = Fixed::new(Err(RunError::NotFound));

        let err = run(&config, &runner, &Interrupt::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildToolNotFound);
        assert_eq!(runner.calls.get(), 0);
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn unresolvable_bare_name_is_tool_not_found() {
        let dir = TempDir::new().unwrap();
        let runner = Fixed::new(Err(RunError::NotFound));

        let err = run(&config_in(dir.path()), &runner, &Interrupt::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildToolNotFound);
        assert_eq!(runner.calls.get(), 1);
    }

    #[test]
    fn non_zero_exit_is_build_failure_with_output_tail() {
        let dir = TempDir::new().unwrap();
        let stdout: String = (1..=40).map(|i| format!("line {}\n", i)).collect();
        let runner = Fixed::new(Ok(CommandOutput {
            output: CapturedOutput::new(stdout, String::new()),
            success: false,
            exit_code: 1,
        }));

        let err = run(&config_in(dir.path()), &runner, &Interrupt::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeployBuildFailed);
        let tail = err.details["outputTail"].as_str().unwrap();
        assert!(tail.starts_with("line 26"));
        assert!(tail.ends_with("line 40"));
    }

    #[test]
    fn success_reports_invocation() {
        let dir = TempDir::new().unwrap();
        let runner = Fixed::new(Ok(CommandOutput {
            success: true,
            ..Default::default()
        }));

        let out = run(&config_in(dir.path()), &runner, &Interrupt::new()).unwrap();
        assert_eq!(out.tool, "mvn");
        assert_eq!(out.args, vec!["clean", "package", "-DskipTests"]);
    }

    #[test]
    fn interrupt_wins_over_build_result() {
        let dir = TempDir::new().unwrap();
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let runner = Fixed::new(Ok(CommandOutput {
            success: false,
            exit_code: 130,
            ..Default::default()
        }));

        let err = run(&config_in(dir.path()), &runner, &interrupt).unwrap_err();
        assert_eq!(err.code, ErrorCode::RunInterrupted);
    }

    #[test]
    fn relative_wrapper_is_found_in_project_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mvnw"), "#!/bin/sh\nexit 0\n").unwrap();
        let mut config = config_in(dir.path());
        config.build_tool = "./mvnw".to_string();
        let runner = Fixed::new(succeeded());

        run(&config, &runner, &Interrupt::new()).unwrap();
        let program = runner.program.borrow().clone().unwrap();
        assert!(Path::new(&program).is_absolute());
        assert_eq!(
            Path::new(&program).canonicalize().unwrap(),
            dir.path().join("mvnw").canonicalize().unwrap()
        );
    }

    #[test]
    fn relative_wrapper_outside_project_dir_is_not_found() {
        let project = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        std::fs::write(elsewhere.path().join("mvnw"), "").unwrap();
        let mut config = config_in(project.path());
        config.build_tool = "./mvnw".to_string();
        let runner = Fixed::new(succeeded());

        let err = run(&config, &runner, &Interrupt::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildToolNotFound);
        assert_eq!(runner.calls.get(), 0);
    }

    #[test]
    fn bare_name_is_left_for_path_lookup() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_tool(&config_in(dir.path())), "mvn");
    }

    #[cfg(unix)]
    #[test]
    fn relative_wrapper_runs_for_real() {
        use crate::runner::SystemRunner;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let wrapper = dir.path().join("mvnw");
        std::fs::write(&wrapper, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();
        let mut config = config_in(dir.path());
        config.build_tool = "./mvnw".to_string();

        let out = run(&config, &SystemRunner, &Interrupt::new()).unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.tool, "./mvnw");
    }

    #[test]
    fn missing_project_dir_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir.path().join("nope"));
        let runner = Fixed::new(Err(RunError::NotFound));

        let err = run(&config, &runner, &Interrupt::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(runner.calls.get(), 0);
    }
}
