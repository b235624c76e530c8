//! Tests for SSH argument construction and exit code handling.

use super::super::*;
use crate::test_support::{CommandInvocation, ScriptedRunner, scripted_executor, test_target};
use rstest::rstest;

#[rstest]
fn execute_passes_user_command_verbatim() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let executor = scripted_executor(&runner).expect("target should validate");

    executor
        .run("apt-get --version")
        .expect("command should succeed");

    let invocations = runner.invocations();
    let invocation = invocations.first().expect("expected an ssh invocation");
    assert_eq!(invocation.program, "ssh");
    assert_eq!(invocation.remote_command(), "apt-get --version");
    let command = invocation.command_string();
    for fragment in [
        "-p 22",
        "-o BatchMode=yes",
        "-o StrictHostKeyChecking=no",
        "-o UserKnownHostsFile=/dev/null",
        "ubuntu@biolinux.test",
    ] {
        assert!(
            command.contains(fragment),
            "expected '{fragment}' in: {command}"
        );
    }
}

#[rstest]
fn sudo_wraps_command_in_escaped_shell() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let executor = scripted_executor(&runner).expect("target should validate");

    executor
        .sudo("apt-get -y install 'a b'")
        .expect("command should succeed");

    assert_eq!(
        runner.remote_commands(),
        vec![String::from(
            "sudo -H bash -c 'apt-get -y install '\\''a b'\\'''"
        )]
    );
}

#[rstest]
fn identity_file_is_forwarded() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let target = SshTarget {
        identity_file: Some(String::from("/keys/id_ed25519")),
        ..test_target()
    };
    let executor = SshExecutor::new(target, runner.clone()).expect("target should validate");

    executor.run("true").expect("command should succeed");

    let command = runner
        .invocations()
        .first()
        .map(CommandInvocation::command_string)
        .expect("expected an invocation");
    assert!(command.contains("-i /keys/id_ed25519"), "got: {command}");
}

#[rstest]
#[case(1)]
#[case(100)]
fn non_zero_exit_is_reported_as_command_failure(#[case] code: i32) {
    let runner = ScriptedRunner::new();
    runner.push_failure(code);
    let executor = scripted_executor(&runner).expect("target should validate");

    let err = executor.run("false").expect_err("command should fail");

    assert_eq!(
        err,
        RemoteError::CommandFailure {
            command: String::from("false"),
            status: Some(code),
            status_text: code.to_string(),
            stderr: String::from("simulated failure"),
        }
    );
}

#[rstest]
fn execute_returns_non_zero_exit_without_error() {
    let runner = ScriptedRunner::new();
    runner.push_exit_code(3);
    let executor = scripted_executor(&runner).expect("target should validate");

    let output = executor
        .execute("test -e /opt", ExecMode::User)
        .expect("transport should succeed");

    assert_eq!(output.exit_code, 3);
    assert!(!output.is_success());
}

#[rstest]
fn missing_exit_code_is_an_error() {
    let runner = ScriptedRunner::new();
    runner.push_missing_exit_code();
    let executor = scripted_executor(&runner).expect("target should validate");

    let err = executor
        .execute("sleep 1", ExecMode::User)
        .expect_err("missing exit code should fail");

    assert_eq!(
        err,
        RemoteError::MissingExitCode {
            program: String::from("ssh")
        }
    );
}

#[rstest]
#[case("host")]
#[case("ssh_user")]
fn validation_rejects_blank_fields(#[case] field: &str) {
    let mut target = test_target();
    match field {
        "host" => target.host = String::from("  "),
        _ => target.user = String::new(),
    }

    let err = SshExecutor::new(target, ScriptedRunner::new()).expect_err("should reject");

    let message = err.to_string();
    assert!(
        message.contains(&format!("BIOLINUX_{}", field.to_uppercase())),
        "error should name env var: {message}"
    );
    assert!(message.contains("biolinux.toml"), "got: {message}");
}

#[rstest]
fn dry_run_reports_success_for_everything() {
    let executor = DryRunExecutor;

    assert!(
        executor
            .succeeds("test -x /usr/bin/cpanm", ExecMode::User)
            .expect("dry run should not fail")
    );
    assert_eq!(executor.sudo("rm -rf /").expect("dry run"), "");
}
