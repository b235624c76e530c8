//! Shared context handed to every install step.

use shell_escape::unix::escape;
use tracing::warn;

use crate::config::RunEnvironment;
use crate::remote::{ExecMode, RemoteError, RemoteExecutor};

/// Ambient run state: the run environment and the remote executor.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    /// Settings for this run.
    pub env: &'a RunEnvironment,
    /// Executor reaching the target host.
    pub remote: &'a dyn RemoteExecutor,
}

impl std::fmt::Debug for InstallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallContext")
            .field("host", &self.env.host)
            .finish_non_exhaustive()
    }
}

impl<'a> InstallContext<'a> {
    /// Bundles the environment with an executor.
    #[must_use]
    pub const fn new(env: &'a RunEnvironment, remote: &'a dyn RemoteExecutor) -> Self {
        Self { env, remote }
    }

    /// Returns the privilege mode used for "safe" privileged steps: `sudo`
    /// when the run allows it, the login user otherwise.
    #[must_use]
    pub const fn safe_mode(&self) -> ExecMode {
        if self.env.use_sudo {
            ExecMode::Sudo
        } else {
            ExecMode::User
        }
    }

    /// Runs `command` as the login user.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the command fails.
    pub fn run(&self, command: &str) -> Result<String, RemoteError> {
        self.remote.run(command)
    }

    /// Runs `command` through `sudo`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the command fails.
    pub fn sudo(&self, command: &str) -> Result<String, RemoteError> {
        self.remote.sudo(command)
    }

    /// Runs `command` with `sudo` when permitted, otherwise as the user.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the command fails.
    pub fn safe_sudo(&self, command: &str) -> Result<String, RemoteError> {
        self.remote.checked(command, self.safe_mode())
    }

    /// Runs `command`, logging rather than propagating a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] only when the transport fails.
    pub fn best_effort(&self, command: &str, mode: ExecMode) -> Result<(), RemoteError> {
        let output = self.remote.execute(command, mode)?;
        if !output.is_success() {
            warn!(exit_code = output.exit_code, "ignoring failure of `{command}`");
        }
        Ok(())
    }

    /// Reports whether `path` exists on the target.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the transport fails.
    pub fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        self.remote
            .succeeds(&format!("test -e {path}"), ExecMode::User)
    }

    /// Writes `contents` to `path` on the target as the login user,
    /// replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the write fails.
    pub fn write_file(&self, path: &str, contents: &str) -> Result<(), RemoteError> {
        self.run(&format!("printf '%s' {} > {path}", escape(contents.into())))?;
        Ok(())
    }

    /// Runs `body` inside a fresh remote temporary directory that is removed
    /// afterwards, whether or not `body` succeeds.
    ///
    /// # Errors
    ///
    /// Returns the error from `body`, or [`RemoteError`] when the directory
    /// cannot be created or removed.
    pub fn with_tmp_dir<T, E>(&self, body: impl FnOnce(&str) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RemoteError>,
    {
        let dir = format!("/tmp/biolinux-{}", uuid::Uuid::new_v4().simple());
        self.run(&format!("mkdir -p {dir}"))?;
        let outcome = body(&dir);
        let cleanup = self.safe_sudo(&format!("rm -rf {dir}"));
        let value = outcome?;
        cleanup?;
        Ok(value)
    }
}
