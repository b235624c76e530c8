//! Remote command execution over SSH with rsync uploads.
//!
//! Every install step in this crate is expressed as a shell command string
//! handed to a [`RemoteExecutor`]. The production implementation shells out
//! to the system `ssh` client and preserves the remote exit code; uploads of
//! local directories use `rsync` over the same SSH transport. A dry-run
//! executor logs commands instead of running them.

use std::ffi::OsString;

use camino::Utf8Path;
use shell_escape::unix::escape;
use thiserror::Error;
use tracing::{debug, info};

mod types;

pub use types::{
    CommandOutput, CommandRunner, ExecMode, ProcessCommandRunner, RemoteCommandOutput,
};

/// Connection settings for the target host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshTarget {
    /// Path to the `ssh` executable.
    pub ssh_bin: String,
    /// Path to the `rsync` executable.
    pub rsync_bin: String,
    /// Remote login user.
    pub user: String,
    /// Hostname or IP address of the target.
    pub host: String,
    /// SSH port on the target.
    pub port: u16,
    /// Optional private key passed with `-i`.
    pub identity_file: Option<String>,
    /// Whether to force batch mode to avoid password prompts.
    pub batch_mode: bool,
    /// Whether to enforce host key checking.
    pub strict_host_key_checking: bool,
    /// Known hosts file handed to `ssh`.
    pub known_hosts_file: String,
}

impl SshTarget {
    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidTarget`] naming the first empty field.
    pub fn validate(&self) -> Result<(), RemoteError> {
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.rsync_bin, "rsync_bin")?;
        Self::require_value(&self.user, "ssh_user")?;
        Self::require_value(&self.host, "host")?;
        Self::require_value(&self.known_hosts_file, "ssh_known_hosts_file")?;
        if let Some(identity) = &self.identity_file {
            Self::require_value(identity, "ssh_identity_file")?;
        }
        Ok(())
    }

    fn require_value(value: &str, field: &str) -> Result<(), RemoteError> {
        if value.trim().is_empty() {
            return Err(RemoteError::InvalidTarget {
                field: field.to_owned(),
            });
        }
        Ok(())
    }

    fn ssh_options(&self) -> Vec<String> {
        vec![
            format!("BatchMode={}", yes_no(self.batch_mode)),
            format!(
                "StrictHostKeyChecking={}",
                yes_no(self.strict_host_key_checking)
            ),
            format!("UserKnownHostsFile={}", self.known_hosts_file),
        ]
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Errors surfaced while executing commands on the target host.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RemoteError {
    /// Raised when connection settings are missing required values.
    #[error("missing {field}: set BIOLINUX_{env_suffix} or add {field} to biolinux.toml", env_suffix = field.to_uppercase())]
    InvalidTarget {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when a local process cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a command completes with a non-zero exit code.
    #[error("`{command}` exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Command that failed.
        command: String,
        /// Exit status as reported by the remote side.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when the transport finishes without yielding an exit status.
    #[error("{program} did not return an exit code")]
    MissingExitCode {
        /// Program that completed without a status.
        program: String,
    },
}

impl RemoteError {
    fn failure(command: &str, status: Option<i32>, stderr: String) -> Self {
        let status_text = status.map_or_else(|| String::from("unknown"), |code| code.to_string());
        Self::CommandFailure {
            command: command.to_owned(),
            status,
            status_text,
            stderr: stderr.trim().to_owned(),
        }
    }
}

/// Executes shell commands on the provisioning target.
pub trait RemoteExecutor {
    /// Runs `command` in the given mode and reports its exit status and
    /// captured output. Non-zero exits are not errors at this level.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the transport itself fails.
    fn execute(&self, command: &str, mode: ExecMode) -> Result<RemoteCommandOutput, RemoteError>;

    /// Copies the contents of the local directory `source` into
    /// `remote_path` on the target.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the transfer fails.
    fn upload(&self, source: &Utf8Path, remote_path: &str) -> Result<(), RemoteError>;

    /// Runs `command` and fails unless it exits with status zero. Returns
    /// the captured stdout.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::CommandFailure`] on a non-zero exit.
    fn checked(&self, command: &str, mode: ExecMode) -> Result<String, RemoteError> {
        let output = self.execute(command, mode)?;
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(RemoteError::failure(
            command,
            Some(output.exit_code),
            output.stderr,
        ))
    }

    /// Runs `command` as the login user.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::CommandFailure`] on a non-zero exit.
    fn run(&self, command: &str) -> Result<String, RemoteError> {
        self.checked(command, ExecMode::User)
    }

    /// Runs `command` through `sudo`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::CommandFailure`] on a non-zero exit.
    fn sudo(&self, command: &str) -> Result<String, RemoteError> {
        self.checked(command, ExecMode::Sudo)
    }

    /// Reports whether `command` exits with status zero.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the transport fails.
    fn succeeds(&self, command: &str, mode: ExecMode) -> Result<bool, RemoteError> {
        Ok(self.execute(command, mode)?.is_success())
    }
}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for &T {
    fn execute(&self, command: &str, mode: ExecMode) -> Result<RemoteCommandOutput, RemoteError> {
        (**self).execute(command, mode)
    }

    fn upload(&self, source: &Utf8Path, remote_path: &str) -> Result<(), RemoteError> {
        (**self).upload(source, remote_path)
    }
}

/// Executes commands with the system `ssh` client.
#[derive(Clone, Debug)]
pub struct SshExecutor<R: CommandRunner> {
    target: SshTarget,
    runner: R,
}

impl SshExecutor<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidTarget`] when validation fails.
    pub fn with_process_runner(target: SshTarget) -> Result<Self, RemoteError> {
        Self::new(target, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> SshExecutor<R> {
    /// Creates a new executor using the provided runner and target.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidTarget`] when target validation fails.
    pub fn new(target: SshTarget, runner: R) -> Result<Self, RemoteError> {
        target.validate()?;
        Ok(Self { target, runner })
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Wraps `command` for the requested privilege level.
    #[must_use]
    pub fn render_command(command: &str, mode: ExecMode) -> String {
        match mode {
            ExecMode::User => command.to_owned(),
            ExecMode::Sudo => format!("sudo -H bash -c {}", escape(command.into())),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.target.user, self.target.host)
    }

    fn build_ssh_args(&self, remote_command: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-p"),
            OsString::from(self.target.port.to_string()),
        ];
        for option in self.target.ssh_options() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(option));
        }
        if let Some(identity) = &self.target.identity_file {
            args.push(OsString::from("-i"));
            args.push(OsString::from(expand_tilde(identity)));
        }
        args.push(OsString::from(self.destination()));
        args.push(OsString::from(remote_command));
        args
    }

    fn build_rsync_args(&self, source: &Utf8Path, remote_path: &str) -> Vec<OsString> {
        let mut remote_shell = format!("{} -p {}", self.target.ssh_bin, self.target.port);
        for option in self.target.ssh_options() {
            remote_shell.push_str(" -o ");
            remote_shell.push_str(&option);
        }
        if let Some(identity) = &self.target.identity_file {
            remote_shell.push_str(" -i ");
            remote_shell.push_str(&escape(expand_tilde(identity).into()));
        }

        vec![
            OsString::from("-az"),
            OsString::from("--rsh"),
            OsString::from(remote_shell),
            OsString::from(format!("{source}/")),
            OsString::from(format!("{}:{remote_path}", self.destination())),
        ]
    }
}

impl<R: CommandRunner> RemoteExecutor for SshExecutor<R> {
    fn execute(&self, command: &str, mode: ExecMode) -> Result<RemoteCommandOutput, RemoteError> {
        debug!(host = %self.target.host, %mode, "{command}");
        let rendered = Self::render_command(command, mode);
        let args = self.build_ssh_args(&rendered);
        let output = self.runner.run(&self.target.ssh_bin, &args)?;
        let Some(exit_code) = output.code else {
            return Err(RemoteError::MissingExitCode {
                program: self.target.ssh_bin.clone(),
            });
        };

        Ok(RemoteCommandOutput {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn upload(&self, source: &Utf8Path, remote_path: &str) -> Result<(), RemoteError> {
        debug!(host = %self.target.host, %source, remote_path, "uploading directory");
        let args = self.build_rsync_args(source, remote_path);
        let output = self.runner.run(&self.target.rsync_bin, &args)?;
        if output.is_success() {
            return Ok(());
        }
        Err(RemoteError::failure(
            &format!("{} {source}/ {remote_path}", self.target.rsync_bin),
            output.code,
            output.stderr,
        ))
    }
}

/// Logs commands instead of running them; every command reports success.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunExecutor;

impl RemoteExecutor for DryRunExecutor {
    fn execute(&self, command: &str, mode: ExecMode) -> Result<RemoteCommandOutput, RemoteError> {
        info!(%mode, "[dry-run] {command}");
        Ok(RemoteCommandOutput::success(""))
    }

    fn upload(&self, source: &Utf8Path, remote_path: &str) -> Result<(), RemoteError> {
        info!("[dry-run] upload {source}/ -> {remote_path}");
        Ok(())
    }
}

/// Expands a leading `~/` prefix to the local user's home directory.
///
/// When `HOME` is unset the input is returned unchanged.
///
/// # Examples
///
/// ```
/// # use biolinux::remote::expand_tilde;
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

#[cfg(test)]
mod tests;
