use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Project-local config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "jarlift.json";

/// Base jarlift config directory (~/.config/jarlift/, %APPDATA%\jarlift on Windows)
pub fn jarlift() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows")
        })?;
        Ok(PathBuf::from(appdata).join("jarlift"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected("HOME environment variable not set on Unix-like system")
        })?;
        Ok(PathBuf::from(home).join(".config").join("jarlift"))
    }
}

/// User-level config file path
pub fn global_config() -> Result<PathBuf> {
    Ok(jarlift()?.join(CONFIG_FILE_NAME))
}

/// Config file in the current working directory
pub fn local_config() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}
