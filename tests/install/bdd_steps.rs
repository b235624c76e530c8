//! BDD step definitions for the `biolinux install` workflow.

use biolinux::InstallOrchestrator;
use biolinux::test_support::scripted_executor;
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{InstallResult, InstallScenario};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a prepared configuration directory")]
fn prepared_configuration(install_scenario: InstallScenario) -> InstallScenario {
    install_scenario.write(
        "main.yaml",
        "packages:\n  - minimal\n  - bio_nextgen\nlibraries:\n  - python-libs\ncustom_ignore:\n  - bowtie2\n",
    );
    install_scenario.write("packages.yaml", "minimal:\n  - git\n");
    install_scenario.write("custom.yaml", "bio_nextgen:\n  - bwa\n  - bowtie2\n");
    install_scenario.write("chef_recipes.yaml", "galaxy:\n  - galaxy\n");
    install_scenario.write("python-libs.yaml", "pypi:\n  - pysam\n");
    install_scenario
}

#[given("the remote command \"{fragment}\" exits with \"{code}\"")]
fn remote_command_fails(
    install_scenario: InstallScenario,
    fragment: String,
    code: i32,
) -> InstallScenario {
    install_scenario.runner.respond_to(fragment, code, "");
    install_scenario
}

#[given("a flavor that drops \"{name}\" from custom installs")]
fn flavor_drops(mut install_scenario: InstallScenario, name: String) -> InstallScenario {
    install_scenario.write(
        "flavor/trimmed/flavor.yaml",
        &format!("name: trimmed\nrewrite:\n  custom:\n    drop: [{name}]\n"),
    );
    install_scenario.env.flavor = Some(String::from("trimmed"));
    install_scenario
}

fn run_install(mut install_scenario: InstallScenario, target: Option<&str>) -> InstallScenario {
    let phase = target.map(InstallScenario::parse_target);
    let executor = scripted_executor(&install_scenario.runner)
        .unwrap_or_else(|err| panic!("scripted executor should build: {err}"));
    let result = InstallOrchestrator::new(&install_scenario.env, &executor)
        .and_then(|orchestrator| orchestrator.install(phase));
    install_scenario.outcome = Some(match result {
        Ok(()) => InstallResult::Success,
        Err(err) => InstallResult::Failure(err.to_string()),
    });
    install_scenario
}

#[when("I install every phase")]
fn install_every_phase(install_scenario: InstallScenario) -> InstallScenario {
    run_install(install_scenario, None)
}

#[when("I install the \"{target}\" target")]
fn install_target(install_scenario: InstallScenario, target: String) -> InstallScenario {
    run_install(install_scenario, Some(&target))
}

#[then("the install succeeds")]
fn install_succeeds(install_scenario: &InstallScenario) -> Result<(), StepError> {
    match &install_scenario.outcome {
        Some(InstallResult::Success) => Ok(()),
        Some(InstallResult::Failure(message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the install fails naming \"{text}\"")]
fn install_fails_naming(install_scenario: &InstallScenario, text: String) -> Result<(), StepError> {
    let Some(InstallResult::Failure(message)) = &install_scenario.outcome else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    if message.contains(&text) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure mentioning {text}, got: {message}"
        )))
    }
}

#[then("a command mentions \"{text}\"")]
fn command_mentions(install_scenario: &InstallScenario, text: String) -> Result<(), StepError> {
    install_scenario
        .position(&text)
        .map(|_| ())
        .ok_or_else(|| {
            StepError::Assertion(format!(
                "expected a command mentioning {text}, got: {:?}",
                install_scenario.commands()
            ))
        })
}

#[then("no command mentions \"{text}\"")]
fn no_command_mentions(install_scenario: &InstallScenario, text: String) -> Result<(), StepError> {
    match install_scenario.position(&text) {
        None => Ok(()),
        Some(index) => Err(StepError::Assertion(format!(
            "command {index} should not mention {text}: {:?}",
            install_scenario.commands()
        ))),
    }
}

#[then("\"{first}\" runs before \"{second}\"")]
fn runs_before(
    install_scenario: &InstallScenario,
    first: String,
    second: String,
) -> Result<(), StepError> {
    let earlier = install_scenario.position(&first);
    let later = install_scenario.position(&second);
    match (earlier, later) {
        (Some(a), Some(b)) if a < b => Ok(()),
        _ => Err(StepError::Assertion(format!(
            "expected {first} before {second}, got: {:?}",
            install_scenario.commands()
        ))),
    }
}
