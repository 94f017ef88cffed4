//! Remote shell interface.
//!
//! Port probes and worker queries run as shell commands on a controller
//! host that can reach the cluster's management network. The harness only
//! looks at stdout and stderr; exit codes are not part of the contract.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ShellError;

/// Default deadline for a single remote command.
pub const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(120);

/// Captured output of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Runs shell commands somewhere that can reach the cluster.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run `command` and capture its output.
    async fn run(&self, command: &str) -> Result<CommandOutput, ShellError>;
}

/// Runs commands on a controller host through the `ssh` binary.
#[derive(Debug, Clone)]
pub struct SshShell {
    host: String,
    user: String,
    identity: Option<PathBuf>,
    deadline: Duration,
}

impl SshShell {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            identity: None,
            deadline: DEFAULT_COMMAND_DEADLINE,
        }
    }

    /// Use a specific private key.
    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(path.into());
        self
    }

    /// Override the per-command deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-oBatchMode=yes")
            .arg("-oStrictHostKeyChecking=no")
            .arg("-oUserKnownHostsFile=/dev/null")
            .arg("-oLogLevel=ERROR");
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(self.target()).arg(remote_command);
        cmd
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, ShellError> {
        debug!(target_host = %self.host, "Running command over ssh");
        run_bounded(self.command(command), "ssh", &self.target(), self.deadline).await
    }
}

/// Runs commands on the local host through `bash -c`.
///
/// Useful when the harness itself runs on the controller.
#[derive(Debug, Clone)]
pub struct LocalShell {
    deadline: Duration,
}

impl LocalShell {
    pub fn new() -> Self {
        Self {
            deadline: DEFAULT_COMMAND_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteShell for LocalShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, ShellError> {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command);
        run_bounded(cmd, "bash", "localhost", self.deadline).await
    }
}

async fn run_bounded(
    mut cmd: Command,
    program: &str,
    target: &str,
    deadline: Duration,
) -> Result<CommandOutput, ShellError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| ShellError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let output = tokio::time::timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| ShellError::Timeout {
            target: target.to_string(),
            deadline,
        })?
        .map_err(|source| ShellError::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
