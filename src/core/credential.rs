//! Remote credential resolution.
//!
//! Passwords come from an environment variable or the system keychain
//! (macOS Keychain, Linux kernel keyring, Windows Credential Manager),
//! never from the configuration file. With neither available, the
//! pipeline relies on key-based SSH authentication.

use std::fmt;
use std::io::Write;

use keyring::Entry;
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempPath};

use crate::error::{Error, ErrorCode, Result};

const SERVICE_NAME: &str = "jarlift";

/// A password that never shows up in Debug or Display output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Password(Secret),
    /// Rely on SSH keys / agent.
    KeyBased,
}

impl Credential {
    pub fn password(&self) -> Option<&Secret> {
        match self {
            Credential::Password(secret) => Some(secret),
            Credential::KeyBased => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Credential::Password(_) => "password",
            Credential::KeyBased => "key-based",
        }
    }
}

/// Where to look for the remote password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CredentialSettings {
    /// Environment variable holding the password.
    #[serde(default = "default_env_var")]
    pub env: String,

    /// Consult the system keychain when the variable is unset.
    #[serde(default = "default_keychain")]
    pub keychain: bool,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            env: default_env_var(),
            keychain: default_keychain(),
        }
    }
}

fn default_env_var() -> String {
    "JARLIFT_PASSWORD".to_string()
}

fn default_keychain() -> bool {
    true
}

/// Keychain account name for a target.
pub fn account(user: &str, host: &str) -> String {
    format!("{}@{}", user, host)
}

/// Resolve the credential for `user@host` from the process environment and keychain.
pub fn resolve(settings: &CredentialSettings, user: &str, host: &str) -> Credential {
    resolve_with(settings, user, host, |key| std::env::var(key).ok())
}

/// Resolve with an explicit environment lookup.
pub fn resolve_with<F>(settings: &CredentialSettings, user: &str, host: &str, env: F) -> Credential
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env(&settings.env).filter(|v| !v.is_empty()) {
        log_status!("credential", "Using password from ${}", settings.env);
        return Credential::Password(Secret::new(value));
    }

    if settings.keychain {
        match get(&account(user, host)) {
            Ok(Some(value)) => {
                log_status!("credential", "Using password from system keychain");
                return Credential::Password(Secret::new(value));
            }
            Ok(None) => {}
            Err(e) => {
                log_status!("credential", "Keychain unavailable ({}); falling back to SSH keys", e);
            }
        }
    }

    Credential::KeyBased
}

fn keyring_error(e: keyring::Error) -> Error {
    Error::new(
        ErrorCode::InternalUnexpected,
        format!("Keychain error: {}", e),
        serde_json::Value::Null,
    )
}

/// Stores a password in the keychain.
pub fn store(account: &str, password: &Secret) -> Result<()> {
    let entry = Entry::new(SERVICE_NAME, account).map_err(keyring_error)?;
    entry.set_password(password.expose()).map_err(keyring_error)?;
    Ok(())
}

/// Retrieves a password from the keychain.
///
/// Returns `None` if the entry doesn't exist.
pub fn get(account: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE_NAME, account).map_err(keyring_error)?;

    match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(keyring_error(e)),
    }
}

/// Deletes a password from the keychain. Returns whether an entry existed.
pub fn delete(account: &str) -> Result<bool> {
    let entry = Entry::new(SERVICE_NAME, account).map_err(keyring_error)?;

    match entry.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(keyring_error(e)),
    }
}

/// Write the password to an owner-only temporary file for tools that read
/// it from disk (`pscp -pwfile`). The file is removed when the path drops.
pub fn password_file(secret: &Secret) -> Result<TempPath> {
    let mut file = NamedTempFile::new().map_err(|e| {
        Error::internal_io(e.to_string(), Some("create password file".to_string()))
    })?;
    file.write_all(secret.expose().as_bytes()).map_err(|e| {
        Error::internal_io(e.to_string(), Some("write password file".to_string()))
    })?;
    file.flush().map_err(|e| {
        Error::internal_io(e.to_string(), Some("write password file".to_string()))
    })?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_keychain() -> CredentialSettings {
        CredentialSettings {
            env: "DEPLOY_PW".to_string(),
            keychain: false,
        }
    }

    #[test]
    fn secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn env_variable_supplies_password() {
        let cred = resolve_with(&no_keychain(), "root", "example.com", |k| {
            (k == "DEPLOY_PW").then(|| "s3cret".to_string())
        });
        assert_eq!(cred, Credential::Password(Secret::new("s3cret")));
    }

    #[test]
    fn empty_env_variable_is_ignored() {
        let cred = resolve_with(&no_keychain(), "root", "example.com", |_| Some(String::new()));
        assert_eq!(cred, Credential::KeyBased);
    }

    #[test]
    fn falls_back_to_key_based() {
        let cred = resolve_with(&no_keychain(), "root", "example.com", |_| None);
        assert_eq!(cred, Credential::KeyBased);
        assert!(cred.password().is_none());
    }

    #[test]
    fn password_file_holds_secret_and_is_removed_on_drop() {
        let path = password_file(&Secret::new("pw-123")).unwrap();
        let on_disk = path.to_path_buf();
        assert_eq!(std::fs::read_to_string(&on_disk).unwrap(), "pw-123");
        drop(path);
        assert!(!on_disk.exists());
    }

    #[test]
    fn account_format() {
        assert_eq!(account("root", "10.0.0.1"), "root@10.0.0.1");
    }

    #[test]
    #[ignore]
    fn keychain_round_trip() {
        // Requires keychain access; run manually with --ignored.
        let acct = "jarlift-test@localhost";
        store(acct, &Secret::new("value")).unwrap();
        assert_eq!(get(acct).unwrap(), Some("value".to_string()));
        assert!(delete(acct).unwrap());
        assert_eq!(get(acct).unwrap(), None);
    }
}
