//! Argument builders shared by the OpenSSH (`scp`/`ssh`) and PuTTY
//! (`pscp`/`plink`) mechanisms.

use crate::config::DeployConfig;

/// Which OpenSSH tool the options are for; they spell the port flag differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSshTool {
    Scp,
    Ssh,
}

/// Options for `scp`/`ssh`: port, identity file, host key policy, timeouts.
pub fn openssh_args(config: &DeployConfig, tool: OpenSshTool) -> Vec<String> {
    let mut args = Vec::new();

    let port_flag = match tool {
        OpenSshTool::Scp => "-P",
        OpenSshTool::Ssh => "-p",
    };
    args.push(port_flag.to_string());
    args.push(config.port.to_string());

    if let Some(identity_file) = &config.identity_file {
        args.push("-i".to_string());
        args.push(identity_file.clone());
    }

    // Timeouts keep a stalled connection from hanging the pipeline.
    args.extend([
        "-o".to_string(),
        format!("StrictHostKeyChecking={}", config.host_key_policy),
        "-o".to_string(),
        "ConnectTimeout=10".to_string(),
        "-o".to_string(),
        "ServerAliveInterval=15".to_string(),
        "-o".to_string(),
        "ServerAliveCountMax=3".to_string(),
    ]);

    args
}

/// Options for `pscp`/`plink`. `-batch` makes PuTTY fail instead of
/// prompting, since its output is captured.
pub fn putty_args(config: &DeployConfig, password_file: &str) -> Vec<String> {
    vec![
        "-batch".to_string(),
        "-P".to_string(),
        config.port.to_string(),
        "-pwfile".to_string(),
        password_file.to_string(),
    ]
}
