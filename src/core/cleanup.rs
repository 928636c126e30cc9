//! Remove stale artifacts before building.
//!
//! Never fatal: a missing directory or an undeletable file is reported and
//! the pipeline moves on. Re-running is always safe.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact;
use crate::error::Result;

pub const STAGE: &str = "clean";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutput {
    pub directory: PathBuf,
    pub directory_exists: bool,
    pub pattern: String,
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<CleanupFailure>,
}

impl CleanupOutput {
    pub fn summary(&self) -> String {
        if !self.directory_exists {
            return "Output directory does not exist".to_string();
        }
        match (self.removed.len(), self.failed.len()) {
            (0, 0) => "No old artifacts found".to_string(),
            (n, 0) => format!("Removed {} old artifact(s)", n),
            (n, f) => format!("Removed {} old artifact(s), {} could not be removed", n, f),
        }
    }
}

pub fn clean(dir: &Path, pattern: &str) -> Result<CleanupOutput> {
    let mut output = CleanupOutput {
        directory: dir.to_path_buf(),
        directory_exists: dir.is_dir(),
        pattern: pattern.to_string(),
        removed: Vec::new(),
        failed: Vec::new(),
    };

    if !output.directory_exists {
        log_status!(STAGE, "{}: {}", output.summary(), dir.display());
        return Ok(output);
    }

    for path in artifact::matching_files(dir, pattern)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match fs::remove_file(&path) {
            Ok(()) => {
                log_status!(STAGE, "Deleted: {}", name);
                output.removed.push(name);
            }
            Err(e) => {
                log_status!(STAGE, "Could not delete {}: {}", name, e);
                output.failed.push(CleanupFailure {
                    file: name,
                    error: e.to_string(),
                });
            }
        }
    }

    log_status!(STAGE, "{}", output.summary());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn removes_only_matching_files() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("app-1.0.jar")).unwrap();
        File::create(dir.path().join("app-1.0.jar.original")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let out = clean(dir.path(), "*.jar").unwrap();
        assert_eq!(out.removed, vec!["app-1.0.jar".to_string()]);
        assert!(!dir.path().join("app-1.0.jar").exists());
        assert!(dir.path().join("app-1.0.jar.original").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(out.summary(), "Removed 1 old artifact(s)");
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let out = clean(&dir.path().join("target"), "*.jar").unwrap();
        assert!(!out.directory_exists);
        assert!(out.removed.is_empty());
        assert_eq!(out.summary(), "Output directory does not exist");
    }

    #[test]
    fn empty_directory_reports_nothing_found() {
        let dir = TempDir::new().unwrap();
        let out = clean(dir.path(), "*.jar").unwrap();
        assert!(out.directory_exists);
        assert_eq!(out.summary(), "No old artifacts found");
    }

    #[test]
    fn rerunning_is_idempotent() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.jar")).unwrap();
        assert_eq!(clean(dir.path(), "*.jar").unwrap().removed.len(), 1);
        assert_eq!(clean(dir.path(), "*.jar").unwrap().removed.len(), 0);
    }
}
