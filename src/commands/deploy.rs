use jarlift::config;
use jarlift::credential;
use jarlift::interrupt::Interrupt;
use jarlift::log_status;
use jarlift::pipeline::{Pipeline, PipelineReport};
use jarlift::runner::{CommandRunner, SystemRunner};

use super::GlobalArgs;
use crate::{output, tty};

const RULE: &str = "==================================================";

/// Run the full pipeline against the real system and return the exit code.
pub fn run(global: &GlobalArgs) -> i32 {
    let interrupt = Interrupt::new();
    if let Err(e) = interrupt.install() {
        return output::finish::<()>(Err(e), global.json);
    }

    let pause = should_pause(global.non_interactive, tty::require_tty_for_interactive());
    let waiting = interrupt.clone();
    let acknowledge = move || {
        if pause {
            // Nothing checks the flag past this point, so Ctrl-C has to exit.
            waiting.exit_on_signal();
            tty::wait_for_enter("Press Enter to exit...");
        }
    };

    execute(global, &SystemRunner, &interrupt, &acknowledge)
}

/// Whether a stage failure should wait for the operator before exiting.
pub fn should_pause(non_interactive: bool, interactive_terminal: bool) -> bool {
    !non_interactive && interactive_terminal
}

/// Load config, resolve credentials, run the pipeline, report.
///
/// `acknowledge` runs after the failure report for stage failures past
/// cleanup; config errors and interrupts exit straight away.
pub fn execute(
    global: &GlobalArgs,
    runner: &dyn CommandRunner,
    interrupt: &Interrupt,
    acknowledge: &dyn Fn(),
) -> i32 {
    if !global.json {
        print_header();
    }

    let config = match config::load(global.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return output::finish::<()>(Err(e), global.json),
    };

    let credential = credential::resolve(&config.credential, &config.user, &config.host);
    log_status!(
        "deploy",
        "Target {} ({} authentication)",
        config.upload_target(),
        credential.describe()
    );

    match Pipeline::new(&config, &credential, runner, interrupt).run() {
        Ok(report) => {
            if !global.json {
                print_completion(&report);
            }
            output::finish(Ok(report), global.json)
        }
        Err(failure) => {
            if !failure.is_interrupt() {
                eprintln!();
                eprintln!("Deployment failed at stage '{}'", failure.stage);
            }
            let code = output::finish::<PipelineReport>(Err(failure.error.clone()), global.json);
            if failure.wants_acknowledgment() {
                acknowledge();
            }
            code
        }
    }
}

fn print_header() {
    tty::status(RULE);
    tty::status("             jarlift: build and deploy");
    tty::status(RULE);
}

fn print_completion(report: &PipelineReport) {
    eprintln!();
    eprintln!("{}", RULE);
    eprintln!("              Deployment complete");
    eprintln!("{}", RULE);
    eprintln!("Application URL: {}", report.app_url);
}
