//! Deployment configuration.
//!
//! Built once at startup from (lowest to highest precedence) built-in
//! defaults, a JSON config file, and `JARLIFT_*` environment variables,
//! then passed by reference to every stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::credential::CredentialSettings;
use crate::error::{Error, Result};
use crate::paths;

/// Keys that would put a secret into the config file.
const FORBIDDEN_SECRET_KEYS: &[&str] = &["password", "serverPassword", "pass", "secret"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployConfig {
    /// Remote server address. Required.
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    /// Remote directory that receives the artifact and holds the deploy script.
    #[serde(default = "default_remote_path")]
    pub remote_path: String,

    /// Working directory for the build tool.
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Build output directory; relative paths are resolved against `project_dir`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Bare executable name (resolved through PATH) or a path to it; relative
    /// paths such as `./mvnw` are resolved against `project_dir`.
    #[serde(default = "default_build_tool")]
    pub build_tool: String,

    #[serde(default = "default_build_args")]
    pub build_args: Vec<String>,

    /// Stale artifacts removed before building.
    #[serde(default = "default_jar_pattern")]
    pub clean_pattern: String,

    /// Artifact picked up after building.
    #[serde(default = "default_jar_pattern")]
    pub artifact_pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    /// Value passed to OpenSSH as `StrictHostKeyChecking`.
    #[serde(default = "default_host_key_policy")]
    pub host_key_policy: String,

    #[serde(default = "default_deploy_script")]
    pub deploy_script: String,

    #[serde(default = "default_deploy_subcommand")]
    pub deploy_subcommand: String,

    /// Printed after a successful deploy. Defaults to `http://<host>:8080`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,

    #[serde(default)]
    pub credential: CredentialSettings,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            user: default_user(),
            remote_path: default_remote_path(),
            project_dir: default_project_dir(),
            output_dir: default_output_dir(),
            build_tool: default_build_tool(),
            build_args: default_build_args(),
            clean_pattern: default_jar_pattern(),
            artifact_pattern: default_jar_pattern(),
            identity_file: None,
            host_key_policy: default_host_key_policy(),
            deploy_script: default_deploy_script(),
            deploy_subcommand: default_deploy_subcommand(),
            app_url: None,
            credential: CredentialSettings::default(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "root".to_string()
}

fn default_remote_path() -> String {
    "/root/java".to_string()
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target")
}

fn default_build_tool() -> String {
    if cfg!(windows) {
        "mvn.cmd".to_string()
    } else {
        "mvn".to_string()
    }
}

fn default_build_args() -> Vec<String> {
    vec![
        "clean".to_string(),
        "package".to_string(),
        "-DskipTests".to_string(),
    ]
}

fn default_jar_pattern() -> String {
    "*.jar".to_string()
}

fn default_host_key_policy() -> String {
    "accept-new".to_string()
}

fn default_deploy_script() -> String {
    "service.sh".to_string()
}

fn default_deploy_subcommand() -> String {
    "deploy".to_string()
}

impl DeployConfig {
    /// Absolute-or-relative output directory as seen from the current process.
    pub fn output_path(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.project_dir.join(&self.output_dir)
        }
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `user@host:remote_path/`, the scp-style upload target.
    pub fn upload_target(&self) -> String {
        format!(
            "{}:{}/",
            self.destination(),
            self.remote_path.trim_end_matches('/')
        )
    }

    pub fn app_url(&self) -> String {
        self.app_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:8080", self.host))
    }

    /// Whether the build tool was given as a path rather than a bare name.
    pub fn build_tool_is_path(&self) -> bool {
        self.build_tool.contains('/') || self.build_tool.contains('\\')
    }

    /// Overlay `JARLIFT_*` variables from `env`.
    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("JARLIFT_HOST") {
            self.host = v;
        }
        if let Some(v) = get("JARLIFT_PORT") {
            self.port = v.trim().parse().map_err(|_| {
                Error::config_invalid_value(
                    "JARLIFT_PORT",
                    Some(v.clone()),
                    "must be a port number between 1 and 65535",
                )
            })?;
        }
        if let Some(v) = get("JARLIFT_USER") {
            self.user = v;
        }
        if let Some(v) = get("JARLIFT_REMOTE_PATH") {
            self.remote_path = v;
        }
        if let Some(v) = get("JARLIFT_PROJECT_DIR") {
            self.project_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JARLIFT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JARLIFT_BUILD_TOOL") {
            self.build_tool = v;
        }
        if let Some(v) = get("JARLIFT_IDENTITY_FILE") {
            self.identity_file = Some(v);
        }
        Ok(())
    }

    /// Expand `~` in paths and check required values.
    pub fn finalize(mut self) -> Result<Self> {
        if self.host.trim().is_empty() {
            return Err(Error::config_missing_key("host", None)
                .with_hint("Set \"host\" in jarlift.json or export JARLIFT_HOST"));
        }
        if self.port == 0 {
            return Err(Error::config_invalid_value(
                "port",
                Some("0".to_string()),
                "must be a port number between 1 and 65535",
            ));
        }
        if self.user.trim().is_empty() {
            return Err(Error::config_missing_key("user", None));
        }
        if self.remote_path.trim().is_empty() {
            return Err(Error::config_missing_key("remotePath", None));
        }
        if self.build_tool.trim().is_empty() {
            return Err(Error::config_missing_key("buildTool", None));
        }
        for (key, pattern) in [
            ("cleanPattern", &self.clean_pattern),
            ("artifactPattern", &self.artifact_pattern),
        ] {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::config_invalid_value(key, Some(pattern.clone()), e.to_string())
            })?;
        }

        self.project_dir = expand_path(&self.project_dir);
        self.output_dir = expand_path(&self.output_dir);
        if self.build_tool_is_path() {
            self.build_tool = shellexpand::tilde(&self.build_tool).to_string();
        }

        if let Some(identity) = self.identity_file.take().filter(|p| !p.is_empty()) {
            let expanded = shellexpand::tilde(&identity).to_string();
            if !Path::new(&expanded).exists() {
                return Err(Error::ssh_identity_file_not_found(expanded));
            }
            self.identity_file = Some(expanded);
        }

        Ok(self)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).to_string()),
        None => path.to_path_buf(),
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Pick the config file: explicit path, else `./jarlift.json`, else the user-level file.
pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::config_invalid_value(
                "config",
                Some(path.display().to_string()),
                "config file does not exist",
            ));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = paths::local_config();
    if local.exists() {
        return Ok(Some(local));
    }

    match paths::global_config() {
        Ok(global) if global.exists() => Ok(Some(global)),
        _ => Ok(None),
    }
}

/// Parse config JSON, refusing literal secrets.
pub fn parse(content: &str, path: &str) -> Result<DeployConfig> {
    let raw: Value =
        serde_json::from_str(content).map_err(|e| Error::config_invalid_json(path, e))?;

    if let Some(key) = find_secret_key(&raw, "") {
        return Err(Error::config_invalid_value(
            key,
            None,
            "passwords must not be stored in the config file",
        )
        .with_hint("Export the password in JARLIFT_PASSWORD (or the variable named by credential.env)")
        .with_hint("Or store it in the system keychain with 'jarlift credential set'")
        .with_hint("Or configure SSH key authentication with identityFile"));
    }

    serde_json::from_value(raw).map_err(|e| Error::config_invalid_json(path, e))
}

/// Dotted path of the first secret-looking key at any depth, e.g. `credential.password`.
fn find_secret_key(value: &Value, prefix: &str) -> Option<String> {
    let obj = value.as_object()?;
    for (key, child) in obj {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        if FORBIDDEN_SECRET_KEYS.contains(&key.as_str()) {
            return Some(dotted);
        }
        if let Some(found) = find_secret_key(child, &dotted) {
            return Some(found);
        }
    }
    None
}

pub fn read_file(path: &Path) -> Result<DeployConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;
    parse(&content, &path.display().to_string())
}

/// Load, overlay the environment, and validate.
pub fn load(explicit: Option<&Path>) -> Result<DeployConfig> {
    load_with(explicit, |key| std::env::var(key).ok())
}

pub fn load_with<F>(explicit: Option<&Path>, env: F) -> Result<DeployConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match locate(explicit)? {
        Some(path) => {
            log_status!("config", "Loading {}", path.display());
            read_file(&path)?
        }
        None => DeployConfig::default(),
    };

    config.apply_env(env)?;
    config.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_maven_layout() {
        let config = DeployConfig::default();
        assert_eq!(config.port, 22);
        assert_eq!(config.output_dir, PathBuf::from("target"));
        assert_eq!(config.build_args, vec!["clean", "package", "-DskipTests"]);
        assert_eq!(config.deploy_script, "service.sh");
        assert_eq!(config.deploy_subcommand, "deploy");
    }

    #[test]
    fn parse_fills_defaults() {
        let config = parse(r#"{"host": "10.0.0.5", "remotePath": "/srv/app"}"#, "x.json").unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.remote_path, "/srv/app");
        assert_eq!(config.user, "root");
        assert!(config.credential.keychain);
        assert_eq!(config.credential.env, "JARLIFT_PASSWORD");
    }

    #[test]
    fn parse_rejects_password_key() {
        let err = parse(r#"{"host": "h", "password": "hunter2"}"#, "x.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "password");
        assert!(!err.to_string().contains("hunter2"));
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn parse_rejects_nested_password_key() {
        let err = parse(
            r#"{"host": "h", "credential": {"env": "X", "password": "hunter2"}}"#,
            "x.json",
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "credential.password");
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn parse_rejects_unknown_credential_keys() {
        let err = parse(r#"{"host": "h", "credential": {"keychian": false}}"#, "x.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidJson);
    }

    #[test]
    fn parse_accepts_credential_settings() {
        let config = parse(
            r#"{"host": "h", "credential": {"env": "DEPLOY_PW", "keychain": false}}"#,
            "x.json",
        )
        .unwrap();
        assert_eq!(config.credential.env, "DEPLOY_PW");
        assert!(!config.credential.keychain);
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let err = parse(r#"{"host": "h", "hots": "typo"}"#, "x.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidJson);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse("{ not json", "x.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidJson);
        assert_eq!(err.details["path"], "x.json");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = parse(r#"{"host": "file-host", "port": 2222}"#, "x.json").unwrap();
        config
            .apply_env(env_of(&[("JARLIFT_HOST", "env-host"), ("JARLIFT_USER", "deploy")]))
            .unwrap();
        assert_eq!(config.host, "env-host");
        assert_eq!(config.user, "deploy");
        assert_eq!(config.port, 2222);
    }

    #[test]
    fn invalid_env_port_is_rejected() {
        let mut config = DeployConfig::default();
        let err = config
            .apply_env(env_of(&[("JARLIFT_PORT", "ssh")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn finalize_requires_host() {
        let err = DeployConfig::default().finalize().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
        assert_eq!(err.details["key"], "host");
    }

    #[test]
    fn finalize_rejects_missing_identity_file() {
        let config = DeployConfig {
            host: "h".to_string(),
            identity_file: Some("/nonexistent/jarlift/id_rsa".to_string()),
            ..Default::default()
        };
        let err = config.finalize().unwrap_err();
        assert_eq!(err.code, ErrorCode::SshIdentityFileNotFound);
    }

    #[test]
    fn finalize_rejects_bad_glob() {
        let config = DeployConfig {
            host: "h".to_string(),
            artifact_pattern: "app-[.jar".to_string(),
            ..Default::default()
        };
        let err = config.finalize().unwrap_err();
        assert_eq!(err.details["key"], "artifactPattern");
    }

    #[test]
    fn output_path_is_relative_to_project_dir() {
        let config = DeployConfig {
            project_dir: PathBuf::from("/work/app"),
            ..Default::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("/work/app/target"));
    }

    #[test]
    fn upload_target_has_single_trailing_slash() {
        let config = DeployConfig {
            host: "example.com".to_string(),
            remote_path: "/root/java/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.upload_target(), "root@example.com:/root/java/");
        assert_eq!(config.app_url(), "http://example.com:8080");
    }

    #[test]
    fn build_tool_path_detection() {
        let mut config = DeployConfig::default();
        config.build_tool = "mvn".to_string();
        assert!(!config.build_tool_is_path());
        config.build_tool = r"D:\apache-maven\bin\mvn.cmd".to_string();
        assert!(config.build_tool_is_path());
        config.build_tool = "/opt/maven/bin/mvn".to_string();
        assert!(config.build_tool_is_path());
    }

    #[test]
    fn load_with_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploy.json");
        fs::write(&path, r#"{"host": "192.0.2.10", "deployScript": "run.sh"}"#).unwrap();

        let config = load_with(Some(path.as_path()), env_of(&[])).unwrap();
        assert_eq!(config.host, "192.0.2.10");
        assert_eq!(config.deploy_script, "run.sh");
    }

    #[test]
    fn load_with_missing_explicit_file_fails() {
        let err = load_with(Some(Path::new("/nonexistent/jarlift.json")), env_of(&[])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }
}
