//! Tests for the library installers and their registry.


use std::cell::RefCell;

use crate::config::RunEnvironment;
use crate::context::InstallContext;
use crate::flavor::Flavor;
use crate::remote::{RemoteError, SshExecutor};
use crate::test_support::{ScriptedRunner, scripted_executor, test_environment};

pub(super) struct Harness {
    pub runner: ScriptedRunner,
    pub executor: SshExecutor<ScriptedRunner>,
    pub env: RunEnvironment,
}

impl Harness {
    pub fn new(runner: ScriptedRunner) -> Self {
        Self::with_env(runner, test_environment())
    }

    pub fn with_env(runner: ScriptedRunner, env: RunEnvironment) -> Self {
        let executor = scripted_executor(&runner).expect("executor");
        Self {
            runner,
            executor,
            env,
        }
    }

    pub fn context(&self) -> InstallContext<'_> {
        InstallContext::new(&self.env, &self.executor)
    }
}

/// Flavor that records every rewrite request and leaves items unchanged.
#[derive(Default)]
pub(super) struct RecordingFlavor {
    pub calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl Flavor for RecordingFlavor {
    fn name(&self) -> &str {
        "recording"
    }

    fn rewrite_config_items(&self, category: &str, items: Vec<String>) -> Vec<String> {
        self.calls
            .borrow_mut()
            .push((category.to_owned(), items.clone()));
        items
    }

    fn post_install(
        &self,
        _context: &InstallContext<'_>,
        _package_groups: &[String],
    ) -> Result<(), RemoteError> {
        Ok(())
    }
}

pub(super) fn yaml(source: &str) -> serde_yaml::Value {
    serde_yaml::from_str(source).expect("yaml")
}

pub(super) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}
