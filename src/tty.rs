//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection, user prompting, and the failure pause.

use std::io::{self, BufRead, IsTerminal, Write};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn is_stdout_tty() -> bool {
    io::stdout().is_terminal()
}

pub fn require_tty_for_interactive() -> bool {
    is_stdin_tty() && is_stdout_tty()
}

fn read_line_from(reader: &mut impl BufRead) -> jarlift::Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| jarlift::Error::internal_io(e.to_string(), Some("read stdin".to_string())))?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_line() -> jarlift::Result<String> {
    read_line_from(&mut io::stdin().lock())
}

/// Read a secret without echoing it.
///
/// On a terminal the input is hidden and asked for twice. Piped stdin is read
/// as one line. Surrounding whitespace is kept since it may be part of the password.
pub fn prompt_password(message: &str) -> jarlift::Result<String> {
    if !is_stdin_tty() {
        return read_line();
    }

    dialoguer::Password::new()
        .with_prompt(message)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(|e| jarlift::Error::internal_io(e.to_string(), Some("read password".to_string())))
}

/// Block until the operator presses Enter.
pub fn wait_for_enter(message: &str) {
    eprint!("{}", message);
    io::stderr().flush().ok();
    let _ = read_line();
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}

// log_status! macro is defined in lib.rs (#[macro_export]) and available crate-wide.

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn piped_secret_keeps_inner_whitespace() {
        let mut input = Cursor::new(" pa ss \r\nnext line\n");
        assert_eq!(read_line_from(&mut input).unwrap(), " pa ss ");
    }

    #[test]
    fn piped_secret_reads_only_first_line() {
        let mut input = Cursor::new("first\nsecond\n");
        assert_eq!(read_line_from(&mut input).unwrap(), "first");
        assert_eq!(read_line_from(&mut input).unwrap(), "second");
    }

    #[test]
    fn empty_input_is_empty_secret() {
        let mut input = Cursor::new("");
        assert_eq!(read_line_from(&mut input).unwrap(), "");
    }
}
