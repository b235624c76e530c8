//! Tests for run environment validation and derived settings.

use super::*;
use crate::test_support::test_environment;
use rstest::rstest;

#[rstest]
fn validate_accepts_test_environment() {
    assert_eq!(test_environment().validate(), Ok(()));
}

#[rstest]
#[case("BIOLINUX_HOST", "host")]
#[case("BIOLINUX_SSH_USER", "ssh_user")]
#[case("BIOLINUX_CONFIG_DIR", "config_dir")]
#[case("BIOLINUX_DISTRIBUTION", "distribution")]
#[case("BIOLINUX_SYSTEM_INSTALL", "system_install")]
fn validate_produces_actionable_errors(#[case] env_var: &str, #[case] toml_key: &str) {
    let mut env = test_environment();
    match toml_key {
        "host" => env.host = String::from(" "),
        "ssh_user" => env.ssh_user.clear(),
        "config_dir" => env.config_dir.clear(),
        "distribution" => env.distribution.clear(),
        _ => env.system_install.clear(),
    }

    let err = env.validate().expect_err("validation should fail");
    let ConfigError::MissingField(ref message) = err else {
        panic!("expected MissingField, got {err:?}");
    };
    assert!(message.contains(env_var), "should mention {env_var}: {message}");
    assert!(message.contains(toml_key), "should mention {toml_key}: {message}");
    assert!(message.contains("biolinux.toml"), "got: {message}");
}

#[rstest]
#[case(None, "")]
#[case(Some("2.7"), "-2.7")]
#[case(Some("  "), "")]
fn python_suffix_includes_separator(#[case] ext: Option<&str>, #[case] expected: &str) {
    let env = RunEnvironment {
        python_version_ext: ext.map(str::to_owned),
        ..test_environment()
    };

    assert_eq!(env.python_suffix(), expected);
}

#[rstest]
fn ruby_suffix_has_no_separator() {
    let env = RunEnvironment {
        ruby_version_ext: Some(String::from("1.9")),
        ..test_environment()
    };

    assert_eq!(env.ruby_suffix(), "1.9");
}

#[rstest]
fn ssh_target_mirrors_connection_settings() {
    let env = RunEnvironment {
        ssh_port: 2222,
        ssh_identity_file: Some(String::from("~/.ssh/id_ed25519")),
        ..test_environment()
    };

    let target = env.ssh_target();

    assert_eq!(target.host, env.host);
    assert_eq!(target.user, env.ssh_user);
    assert_eq!(target.port, 2222);
    assert_eq!(target.identity_file.as_deref(), Some("~/.ssh/id_ed25519"));
}

#[rstest]
fn string_properties_skip_non_string_fields() {
    let env = RunEnvironment {
        flavor: Some(String::from("minimal")),
        ..test_environment()
    };

    let props = env.string_properties().expect("settings serialize");

    assert_eq!(props.get("host").map(String::as_str), Some("biolinux.test"));
    assert_eq!(props.get("flavor").map(String::as_str), Some("minimal"));
    assert_eq!(props.get("chef_dir").map(String::as_str), Some("config/chef"));
    assert!(!props.contains_key("use_sudo"));
    assert!(!props.contains_key("ssh_port"));
    assert!(!props.contains_key("python_version_ext"));
}
