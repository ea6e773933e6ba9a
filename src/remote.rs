//! The remote execution collaborator.
//!
//! Provisioning code talks to hosts only through [`RemoteExecutor`]: run a
//! command and get its exit status and output, or upload file contents. The
//! transport behind it (SSH session handling, retries, timeouts) is supplied
//! by the caller.

use crate::error::{Error, Result};
use std::sync::Mutex;
use tracing::{debug, error};

/// Quote one argument for a POSIX shell command line.
///
/// Plain tokens pass through unchanged; anything else is single-quoted.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_.:/%+=,@".contains(ch))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\"'\"'"))
    }
}

/// Quote each argument and join them with spaces.
pub fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|v| shell_quote(v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of running one command on a host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Synchronous command execution against one host.
pub trait RemoteExecutor {
    /// Host this executor talks to.
    fn host(&self) -> &str;

    /// Run a shell command. A non-zero exit is not an error here.
    fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Write `contents` to `remote_path` on the host.
    fn put(&self, contents: &[u8], remote_path: &str) -> Result<()>;

    /// Run a command and fail on a non-zero exit status.
    fn run_checked(&self, command: &str) -> Result<CommandOutput> {
        let output = self.run(command)?;
        if !output.succeeded() {
            error!(
                host = %self.host(),
                command = %command,
                stdout = %output.stdout.trim(),
                stderr = %output.stderr.trim(),
                "Command failed"
            );
            return Err(Error::CommandFailed {
                host: self.host().to_string(),
                command: command.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// One recorded interaction with a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Command(String),
    Upload { path: String, contents: String },
}

/// Executor that records what would run instead of touching a host.
///
/// Commands starting with a scripted prefix get the scripted reply; every
/// other command succeeds with empty output.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    host: String,
    replies: Vec<(String, CommandOutput)>,
    log: Mutex<Vec<Recorded>>,
}

impl RecordingExecutor {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Reply with `output` to commands starting with `prefix`.
    pub fn with_reply(mut self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.replies.push((prefix.into(), output));
        self
    }

    /// Everything recorded so far, in order.
    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Only the commands, in order.
    pub fn commands(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Command(c) => Some(c),
                Recorded::Upload { .. } => None,
            })
            .collect()
    }

    fn record(&self, entry: Recorded) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
    }
}

impl RemoteExecutor for RecordingExecutor {
    fn host(&self) -> &str {
        &self.host
    }

    fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!(host = %self.host, command = %command, "Recording command");
        self.record(Recorded::Command(command.to_string()));
        let reply = self
            .replies
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(reply)
    }

    fn put(&self, contents: &[u8], remote_path: &str) -> Result<()> {
        debug!(host = %self.host, path = %remote_path, bytes = contents.len(), "Recording upload");
        self.record(Recorded::Upload {
            path: remote_path.to_string(),
            contents: String::from_utf8_lossy(contents).into_owned(),
        });
        Ok(())
    }
}
