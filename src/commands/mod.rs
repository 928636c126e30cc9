use std::path::PathBuf;

pub type CmdResult<T> = jarlift::Result<(T, i32)>;

/// Flags shared by every command.
pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub non_interactive: bool,
    pub json: bool,
}

pub mod credential;
pub mod deploy;

/// Emit a command result and map it to an exit code.
pub(crate) fn finish<T: serde::Serialize>(result: CmdResult<T>, global: &GlobalArgs) -> i32 {
    match result {
        Ok((data, exit_code)) => match crate::output::finish(Ok(data), global.json) {
            0 => exit_code,
            failed => failed,
        },
        Err(err) => crate::output::finish::<()>(Err(err), global.json),
    }
}
