//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::rc::Rc;

use crate::config::RunEnvironment;
use crate::remote::{CommandOutput, CommandRunner, RemoteError, SshExecutor, SshTarget};

/// Scripted command runner that returns pre-seeded outputs.
///
/// Responses registered with [`ScriptedRunner::respond_to`] are matched
/// first against the final argument of each invocation (the remote command
/// for `ssh`). Otherwise queued responses are returned in FIFO order, then
/// the fallback configured by [`ScriptedRunner::succeeding`], if any.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    rules: Rc<RefCell<Vec<(String, CommandOutput)>>>,
    fallback: Rc<RefCell<Option<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the final argument, which carries the remote command for
    /// `ssh` invocations and the destination for `rsync`.
    #[must_use]
    pub fn remote_command(&self) -> String {
        self.args
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn output(
    code: Option<i32>,
    stdout: impl Into<String>,
    stderr: impl Into<String>,
) -> CommandOutput {
    CommandOutput {
        code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner that answers every unmatched invocation with a
    /// successful, empty output.
    #[must_use]
    pub fn succeeding() -> Self {
        let runner = Self::default();
        runner.fallback.replace(Some(output(Some(0), "", "")));
        runner
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Returns the final argument of every invocation in order.
    #[must_use]
    pub fn remote_commands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(CommandInvocation::remote_command)
            .collect()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.responses.borrow_mut().push_back(output(Some(0), "", ""));
    }

    /// Pushes a specific exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.responses
            .borrow_mut()
            .push_back(output(Some(code), "", ""));
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.responses
            .borrow_mut()
            .push_back(output(Some(code), "", "simulated failure"));
    }

    /// Pushes a response with no exit code to simulate abnormal termination.
    pub fn push_missing_exit_code(&self) {
        self.responses.borrow_mut().push_back(output(None, "", ""));
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses
            .borrow_mut()
            .push_back(output(code, stdout, stderr));
    }

    /// Answers every invocation whose final argument contains `fragment`
    /// with the given exit code and stdout.
    pub fn respond_to(&self, fragment: impl Into<String>, code: i32, stdout: impl Into<String>) {
        self.rules
            .borrow_mut()
            .push((fragment.into(), output(Some(code), stdout, "")));
    }

    fn next_response(&self, invocation: &CommandInvocation) -> Option<CommandOutput> {
        let remote = invocation.remote_command();
        let matched = self
            .rules
            .borrow()
            .iter()
            .find(|(fragment, _)| remote.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());
        matched
            .or_else(|| self.responses.borrow_mut().pop_front())
            .or_else(|| self.fallback.borrow().clone())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RemoteError> {
        let invocation = CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        };
        let response = self.next_response(&invocation);
        self.invocations.borrow_mut().push(invocation);
        response.ok_or_else(|| RemoteError::Spawn {
            program: program.to_owned(),
            message: String::from("no scripted response available"),
        })
    }
}

/// Connection settings used throughout the test suites.
#[must_use]
pub fn test_target() -> SshTarget {
    SshTarget {
        ssh_bin: String::from("ssh"),
        rsync_bin: String::from("rsync"),
        user: String::from("ubuntu"),
        host: String::from("biolinux.test"),
        port: 22,
        identity_file: None,
        batch_mode: true,
        strict_host_key_checking: false,
        known_hosts_file: String::from("/dev/null"),
    }
}

/// Builds an SSH executor that drives `runner` instead of real processes.
///
/// # Errors
///
/// Returns [`RemoteError::InvalidTarget`] if the test target is invalid.
pub fn scripted_executor(
    runner: &ScriptedRunner,
) -> Result<SshExecutor<ScriptedRunner>, RemoteError> {
    SshExecutor::new(test_target(), runner.clone())
}

/// Run environment matching [`test_target`] with production defaults.
#[must_use]
pub fn test_environment() -> RunEnvironment {
    RunEnvironment {
        host: String::from("biolinux.test"),
        ssh_user: String::from("ubuntu"),
        ssh_port: 22,
        ssh_bin: String::from("ssh"),
        rsync_bin: String::from("rsync"),
        ssh_identity_file: None,
        ssh_batch_mode: true,
        ssh_strict_host_key_checking: false,
        ssh_known_hosts_file: String::from("/dev/null"),
        config_dir: String::from("config"),
        flavor: None,
        distribution: String::from("ubuntu"),
        use_sudo: true,
        nixpkgs: false,
        system_install: String::from("/usr"),
        local_install: String::from("~/install"),
        python_version_ext: None,
        ruby_version_ext: None,
        pip_cmd: String::from("pip"),
        is_ec2_image: false,
        chef_dir: String::from("config/chef"),
        use_chef_omnibus_installer: false,
        install_log: String::from("/var/log/biolinux.log"),
    }
}
