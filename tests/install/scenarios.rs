//! BDD scenarios for the install workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{InstallScenario, install_scenario};

#[scenario(
    path = "tests/features/install.feature",
    name = "Run every phase in order"
)]
fn scenario_full_install(install_scenario: InstallScenario) {
    drop(install_scenario);
}

#[scenario(
    path = "tests/features/install.feature",
    name = "Select only the libraries phase"
)]
fn scenario_libraries_target(install_scenario: InstallScenario) {
    drop(install_scenario);
}

#[scenario(
    path = "tests/features/install.feature",
    name = "Stop at the first failing package command"
)]
fn scenario_fail_fast(install_scenario: InstallScenario) {
    drop(install_scenario);
}

#[scenario(
    path = "tests/features/install.feature",
    name = "Apply a flavor that drops a custom program"
)]
fn scenario_flavor_rewrite(install_scenario: InstallScenario) {
    drop(install_scenario);
}
