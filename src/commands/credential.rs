use clap::{Args, Subcommand};
use serde::Serialize;

use jarlift::config;
use jarlift::credential::{self, Credential, Secret};
use jarlift::{Error, ErrorCode};

use super::{CmdResult, GlobalArgs};
use crate::tty;

#[derive(Debug, Args)]
pub struct CredentialArgs {
    #[command(subcommand)]
    command: CredentialCommand,
}

#[derive(Debug, Subcommand)]
enum CredentialCommand {
    /// Store the server password in the system keychain (reads stdin when piped)
    Set,
    /// Remove the stored server password
    Clear,
    /// Show which authentication method a deploy would use
    Status,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOutput {
    pub command: String,
    pub account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
}

pub fn run(args: CredentialArgs, global: &GlobalArgs) -> CmdResult<CredentialOutput> {
    let config = config::load(global.config.as_deref())?;
    let account = credential::account(&config.user, &config.host);

    match args.command {
        CredentialCommand::Set => {
            let password = tty::prompt_password(&format!("Password for {}", account))?;
            let secret = validate_password(password)?;
            credential::store(&account, &secret)?;
            tty::status(&format!("Stored password for {} in the system keychain", account));

            Ok((
                CredentialOutput {
                    command: "credential.set".to_string(),
                    account,
                    stored: Some(true),
                    removed: None,
                    authentication: None,
                },
                0,
            ))
        }
        CredentialCommand::Clear => {
            let removed = credential::delete(&account)?;
            if removed {
                tty::status(&format!("Removed stored password for {}", account));
            } else {
                tty::status(&format!("No stored password for {}", account));
            }

            Ok((
                CredentialOutput {
                    command: "credential.clear".to_string(),
                    account,
                    stored: None,
                    removed: Some(removed),
                    authentication: None,
                },
                0,
            ))
        }
        CredentialCommand::Status => {
            let resolved = credential::resolve(&config.credential, &config.user, &config.host);
            if matches!(resolved, Credential::KeyBased) {
                tty::status("No password found; deploy will rely on SSH keys or agent");
            }

            Ok((
                CredentialOutput {
                    command: "credential.status".to_string(),
                    account,
                    stored: None,
                    removed: None,
                    authentication: Some(resolved.describe().to_string()),
                },
                0,
            ))
        }
    }
}

fn validate_password(password: String) -> jarlift::Result<Secret> {
    if password.is_empty() {
        return Err(Error::new(
            ErrorCode::ConfigInvalidValue,
            "Password cannot be empty",
            serde_json::json!({ "key": "password", "problem": "empty" }),
        )
        .with_hint("Use 'jarlift credential clear' to remove a stored password"));
    }
    Ok(Secret::new(password))
}
