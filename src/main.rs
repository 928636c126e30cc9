use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod tty;

use commands::{credential, deploy, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "jarlift")]
#[command(version = VERSION)]
#[command(about = "Build a backend jar, upload it to a server, and run its deploy script")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./jarlift.json, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Never wait for Enter after a failure
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Print a JSON result envelope on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the deployment pipeline (default when no command is given)
    Deploy,
    /// Manage the server password in the system keychain
    Credential(credential::CredentialArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config: cli.config,
        non_interactive: cli.non_interactive,
        json: cli.json,
    };

    let exit_code = match cli.command.unwrap_or(Commands::Deploy) {
        Commands::Deploy => deploy::run(&global),
        Commands::Credential(args) => commands::finish(credential::run(args, &global), &global),
    };

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
