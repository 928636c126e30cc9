//! Artifact discovery in the build output directory.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};

pub const STAGE: &str = "locate";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Regular files directly inside `dir` whose names match `pattern`.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );

    let entries = glob::glob(&full)
        .map_err(|e| {
            Error::config_invalid_value(
                "pattern",
                Some(pattern.to_string()),
                format!("invalid glob pattern: {}", e),
            )
        })?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    Ok(entries)
}

/// Pick the most recently modified candidate.
///
/// Exact timestamp ties go to the lexicographically greatest path so the
/// choice does not depend on directory listing order.
pub fn select_newest(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().max_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.cmp(&b.path))
    })
}

/// Find the newest artifact matching `pattern` in `dir`.
pub fn locate(dir: &Path, pattern: &str) -> Result<Artifact> {
    if !dir.is_dir() {
        return Err(Error::artifact_not_found(dir.display().to_string(), pattern)
            .with_hint("The output directory does not exist; did the build run in projectDir?"));
    }

    let candidates: Vec<Candidate> = matching_files(dir, pattern)?
        .into_iter()
        .map(|path| {
            let modified = path
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Candidate { path, modified }
        })
        .collect();

    if candidates.len() > 1 {
        log_status!(STAGE, "{} candidates match '{}'", candidates.len(), pattern);
    }

    let chosen = select_newest(candidates)
        .ok_or_else(|| Error::artifact_not_found(dir.display().to_string(), pattern))?;

    let size = chosen.path.metadata().map(|m| m.len()).unwrap_or(0);
    let file_name = chosen
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    log_status!(STAGE, "Found artifact: {}", file_name);

    Ok(Artifact {
        path: chosen.path,
        file_name,
        size,
        modified: DateTime::<Local>::from(chosen.modified),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
        path
    }

    #[test]
    fn picks_newest_by_modification_time() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app-1.0.jar", 120);
        let newer = touch(dir.path(), "app-1.1.jar", 10);

        let artifact = locate(dir.path(), "app-*.jar").unwrap();
        assert_eq!(artifact.path, newer);
        assert_eq!(artifact.file_name, "app-1.1.jar");
    }

    #[test]
    fn newest_wins_even_when_lexically_smaller() {
        let dir = TempDir::new().unwrap();
        let newer = touch(dir.path(), "app-a.jar", 5);
        touch(dir.path(), "app-z.jar", 500);

        let artifact = locate(dir.path(), "*.jar").unwrap();
        assert_eq!(artifact.path, newer);
    }

    #[test]
    fn ties_break_lexicographically() {
        let now = SystemTime::now();
        let chosen = select_newest(vec![
            Candidate {
                path: PathBuf::from("target/app-b.jar"),
                modified: now,
            },
            Candidate {
                path: PathBuf::from("target/app-c.jar"),
                modified: now,
            },
            Candidate {
                path: PathBuf::from("target/app-a.jar"),
                modified: now,
            },
        ])
        .unwrap();
        assert_eq!(chosen.path, PathBuf::from("target/app-c.jar"));
    }

    #[test]
    fn no_match_is_artifact_not_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app.war", 1);

        let err = locate(dir.path(), "*.jar").unwrap_err();
        assert_eq!(err.code, ErrorCode::DeployArtifactNotFound);
        assert_eq!(err.details["pattern"], "*.jar");
    }

    #[test]
    fn missing_directory_is_artifact_not_found() {
        let dir = TempDir::new().unwrap();
        let err = locate(&dir.path().join("target"), "*.jar").unwrap_err();
        assert_eq!(err.code, ErrorCode::DeployArtifactNotFound);
    }

    #[test]
    fn directories_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("classes.jar")).unwrap();

        assert!(matching_files(dir.path(), "*.jar").unwrap().is_empty());
    }

    #[test]
    fn directory_names_with_glob_chars_are_escaped() {
        let dir = TempDir::new().unwrap();
        let odd = dir.path().join("out[1]");
        fs::create_dir(&odd).unwrap();
        let jar = touch(&odd, "app.jar", 1);

        assert_eq!(matching_files(&odd, "*.jar").unwrap(), vec![jar]);
    }
}
