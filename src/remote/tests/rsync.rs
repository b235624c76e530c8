//! Tests for rsync-based directory uploads.

use camino::Utf8Path;
use rstest::rstest;

use super::super::*;
use crate::test_support::{ScriptedRunner, scripted_executor};

#[rstest]
fn upload_uses_rsync_over_ssh() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let executor = scripted_executor(&runner).expect("target should validate");

    executor
        .upload(Utf8Path::new("config/chef/cookbooks"), "/tmp/chef-solo/cookbooks")
        .expect("upload should succeed");

    let invocations = runner.invocations();
    let invocation = invocations.first().expect("expected an rsync invocation");
    assert_eq!(invocation.program, "rsync");
    let command = invocation.command_string();
    assert!(command.contains("--rsh ssh -p 22 -o BatchMode=yes"), "got: {command}");
    assert!(command.contains("config/chef/cookbooks/ "), "got: {command}");
    assert_eq!(
        invocation.remote_command(),
        "ubuntu@biolinux.test:/tmp/chef-solo/cookbooks"
    );
}

#[rstest]
fn upload_failure_surfaces_status() {
    let runner = ScriptedRunner::new();
    runner.push_failure(23);
    let executor = scripted_executor(&runner).expect("target should validate");

    let err = executor
        .upload(Utf8Path::new("roles"), "/tmp/chef-solo/roles")
        .expect_err("upload should fail");

    let RemoteError::CommandFailure { status, .. } = err else {
        panic!("expected CommandFailure, got {err:?}");
    };
    assert_eq!(status, Some(23));
}
