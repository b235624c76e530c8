//! Shared fixtures for install BDD scenarios.

use std::fs;
use std::sync::Arc;

use biolinux::test_support::{ScriptedRunner, test_environment};
use biolinux::{Phase, RunEnvironment};
use camino::Utf8PathBuf;
use rstest::fixture;
use tempfile::TempDir;

#[derive(Clone, Debug)]
pub struct InstallScenario {
    pub runner: ScriptedRunner,
    pub env: RunEnvironment,
    pub root: Utf8PathBuf,
    pub outcome: Option<InstallResult>,
    _tmp: Arc<TempDir>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstallResult {
    Success,
    Failure(String),
}

impl InstallScenario {
    pub fn write(&self, name: &str, contents: &str) {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("create parent directories for {path}: {err}"));
        }
        fs::write(&path, contents).unwrap_or_else(|err| panic!("write {path}: {err}"));
    }

    pub fn commands(&self) -> Vec<String> {
        self.runner.remote_commands()
    }

    pub fn position(&self, fragment: &str) -> Option<usize> {
        self.commands()
            .iter()
            .position(|command| command.contains(fragment))
    }

    pub fn parse_target(target: &str) -> Phase {
        target
            .parse::<Phase>()
            .unwrap_or_else(|err| panic!("scenario target should parse: {err}"))
    }
}

#[fixture]
pub fn install_scenario() -> InstallScenario {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("create config temp directory: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("config path should be valid UTF-8: {}", path.display()));
    let env = RunEnvironment {
        config_dir: root.to_string(),
        chef_dir: root.join("chef").to_string(),
        ..test_environment()
    };
    InstallScenario {
        runner: ScriptedRunner::succeeding(),
        env,
        root,
        outcome: None,
        _tmp: Arc::new(tmp),
    }
}
