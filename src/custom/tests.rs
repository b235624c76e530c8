//! Tests for custom install resolution and the built-in modules.

use std::collections::BTreeMap;

use rstest::rstest;

use super::*;
use crate::config::RunEnvironment;
use crate::remote::SshExecutor;
use crate::test_support::{ScriptedRunner, scripted_executor, test_environment};

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(package, group)| ((*package).to_owned(), (*group).to_owned()))
        .collect()
}

fn noop(_context: &InstallContext<'_>) -> Result<(), InstallError> {
    Ok(())
}

fn announce(context: &InstallContext<'_>) -> Result<(), InstallError> {
    context.run("echo installing my-tool")?;
    Ok(())
}

struct Target {
    runner: ScriptedRunner,
    executor: SshExecutor<ScriptedRunner>,
    env: RunEnvironment,
}

impl Target {
    fn new(runner: ScriptedRunner) -> Self {
        let executor = scripted_executor(&runner).expect("executor");
        Self {
            runner,
            executor,
            env: test_environment(),
        }
    }

    fn context(&self) -> InstallContext<'_> {
        InstallContext::new(&self.env, &self.executor)
    }
}

#[rstest]
#[case("samtools", "install_samtools")]
#[case("My-Tool", "install_my_tool")]
#[case("bowtie2", "install_bowtie2")]
fn function_names_are_normalised(#[case] package: &str, #[case] expected: &str) {
    assert_eq!(install_function_name(package), expected);
}

#[rstest]
fn resolve_uses_owning_group_as_module() {
    let registry = CustomRegistry::standard();

    let (module, _) = registry
        .resolve("BWA", &mapping(&[("bwa", "bio_nextgen")]))
        .expect("resolve");

    assert_eq!(module, "bio_nextgen");
}

#[rstest]
fn resolve_falls_back_to_package_name() {
    let mut registry = CustomRegistry::new();
    registry.register("cloudman", "install_cloudman", noop);

    let (module, _) = registry
        .resolve("cloudman", &BTreeMap::new())
        .expect("unmapped name resolves by module");

    assert_eq!(module, "cloudman");
}

#[rstest]
fn unknown_module_issues_no_remote_command() {
    let target = Target::new(ScriptedRunner::succeeding());

    let err = CustomRegistry::standard()
        .install(&target.context(), "not-a-tool", &BTreeMap::new())
        .expect_err("unregistered");

    assert!(matches!(
        err,
        InstallError::Resolution(ResolutionError::UnknownModule { ref module, .. })
            if module == "not-a-tool"
    ));
    assert!(target.runner.invocations().is_empty());
}

#[rstest]
fn unknown_function_in_known_module_is_reported() {
    let target = Target::new(ScriptedRunner::succeeding());

    let err = CustomRegistry::standard()
        .install(
            &target.context(),
            "picard",
            &mapping(&[("picard", "bio_nextgen")]),
        )
        .expect_err("no install_picard");

    assert_eq!(
        err.to_string(),
        "resolution error: custom install module bio_nextgen has no function install_picard"
    );
    assert!(target.runner.invocations().is_empty());
}

#[rstest]
fn install_invokes_registered_function() {
    let target = Target::new(ScriptedRunner::succeeding());
    let mut registry = CustomRegistry::new();
    registry.register("utilities", "install_my_tool", announce);

    registry
        .install(
            &target.context(),
            "My-Tool",
            &mapping(&[("my-tool", "utilities")]),
        )
        .expect("install");

    assert_eq!(
        target.runner.remote_commands(),
        vec![String::from("echo installing my-tool")]
    );
}

#[rstest]
fn builtin_skips_tool_already_on_path() {
    let target = Target::new(ScriptedRunner::succeeding());

    bio_nextgen::install_bwa(&target.context()).expect("install");

    assert_eq!(
        target.runner.remote_commands(),
        vec![String::from("command -v bwa >/dev/null")]
    );
}

#[rstest]
fn builtin_builds_in_temporary_directory() {
    let runner = ScriptedRunner::succeeding();
    runner.respond_to("command -v bwa", 1, "");
    let target = Target::new(runner);

    bio_nextgen::install_bwa(&target.context()).expect("install");

    let commands = target.runner.remote_commands();
    let work_dir = commands
        .get(1)
        .and_then(|cmd| cmd.strip_prefix("mkdir -p "))
        .expect("temporary directory created")
        .to_owned();
    assert!(work_dir.starts_with("/tmp/biolinux-"));
    assert!(commands.iter().any(|cmd| cmd
        == &format!("cd {work_dir} && tar -xf bwa-0.7.17.tar.bz2")));
    assert!(
        commands
            .iter()
            .any(|cmd| cmd == &format!("cd {work_dir}/bwa-0.7.17 && make"))
    );
    assert!(commands.iter().any(|cmd| cmd.contains("install -m 0755")
        && cmd.contains("bwa-0.7.17/bwa /usr/bin/")));
    assert_eq!(
        commands.last().map(String::as_str),
        Some(format!("sudo -H bash -c 'rm -rf {work_dir}'").as_str())
    );
}

#[rstest]
fn temporary_directory_is_removed_after_failure() {
    let runner = ScriptedRunner::succeeding();
    runner.respond_to("command -v samtools", 1, "");
    runner.respond_to("./configure", 2, "");
    let target = Target::new(runner);

    let err = bio_nextgen::install_samtools(&target.context()).expect_err("configure fails");

    assert!(matches!(err, InstallError::Remote(_)));
    let commands = target.runner.remote_commands();
    assert!(commands.iter().all(|cmd| !cmd.ends_with("&& make")));
    assert!(
        commands
            .last()
            .is_some_and(|cmd| cmd.starts_with("sudo -H bash -c 'rm -rf /tmp/biolinux-"))
    );
}

#[rstest]
#[case("bwa-0.7.17.tar.bz2", "bwa-0.7.17")]
#[case("bowtie2-2.3.5.1-linux-x86_64.zip", "bowtie2-2.3.5.1-linux-x86_64")]
#[case("tool.tgz", "tool")]
#[case("plain", "plain")]
fn archive_directories_strip_known_suffixes(#[case] archive: &str, #[case] expected: &str) {
    assert_eq!(build::unpacked_dir(archive), expected);
}
