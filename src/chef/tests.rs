//! Tests for chef node attributes and provisioning.

use std::fs;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::test_support::{ScriptedRunner, scripted_executor, test_environment};

struct ChefRepo {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

#[fixture]
fn repo() -> ChefRepo {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path");
    ChefRepo { _tmp: tmp, root }
}

#[rstest]
fn properties_strip_chef_prefix_and_namespace_the_rest() {
    let env = RunEnvironment {
        chef_dir: String::from("/srv/chef"),
        ..test_environment()
    };

    let properties = build_chef_properties(&env, Value::Null).expect("properties");

    assert_eq!(properties.get("dir"), Some(&json!("/srv/chef")));
    assert_eq!(properties.get("cloudbiolinux_ssh_user"), Some(&json!("ubuntu")));
    assert_eq!(properties.get("cloudbiolinux_host"), Some(&json!("biolinux.test")));
    assert!(!properties.contains_key("chef_dir"));
    assert!(!properties.contains_key("cloudbiolinux_use_sudo"), "booleans are skipped");
}

#[rstest]
fn explicit_attributes_win_over_environment() {
    let extra = json!({"host": "from-json", "apache": {"port": 80}});

    let properties = build_chef_properties(&test_environment(), extra).expect("properties");

    assert_eq!(properties.get("host"), Some(&json!("from-json")));
    assert!(!properties.contains_key("cloudbiolinux_host"));
    assert_eq!(properties.get("apache"), Some(&json!({"port": 80})));
}

#[rstest]
fn non_object_attributes_are_rejected() {
    let err = build_chef_properties(&test_environment(), json!([1, 2])).expect_err("array");

    assert!(matches!(err, InstallError::ChefAttributes(_)));
}

#[rstest]
fn configure_reads_commented_node_extra(repo: ChefRepo) {
    fs::write(
        repo.root.join(NODE_EXTRA),
        "{\n  // shared attributes\n  \"galaxy_home\": \"/mnt/galaxy\" /* trailing */\n}\n",
    )
    .expect("write node_extra.json");

    let chef = ChefSolo::configure(&test_environment(), &ConfigFiles::new(repo.root.clone()))
        .expect("configure");

    assert_eq!(
        chef.attributes.get("galaxy_home"),
        Some(&json!("/mnt/galaxy"))
    );
}

#[rstest]
fn node_json_lists_recipes_in_order() {
    let mut chef = ChefSolo {
        chef_dir: Utf8PathBuf::from("config/chef"),
        attributes: Map::new(),
        recipes: Vec::new(),
        use_omnibus_installer: false,
    };
    chef.add_recipe("galaxy");
    chef.add_recipe("cloudman");

    assert_eq!(
        chef.node_json(),
        json!({"run_list": ["recipe[galaxy]", "recipe[cloudman]"]})
    );
}

#[rstest]
fn provision_uploads_existing_directories_and_runs_chef_solo(repo: ChefRepo) {
    fs::create_dir_all(repo.root.join("cookbooks")).expect("cookbooks dir");
    let env = RunEnvironment {
        chef_dir: repo.root.to_string(),
        use_chef_omnibus_installer: true,
        ..test_environment()
    };
    let runner = ScriptedRunner::succeeding();
    let executor = scripted_executor(&runner).expect("executor");
    let context = InstallContext::new(&env, &executor);

    install_chef_recipes(
        &context,
        &ConfigFiles::new(repo.root.clone()),
        &[String::from("galaxy")],
    )
    .expect("provision");

    let invocations = runner.invocations();
    let programs: Vec<&str> = invocations
        .iter()
        .map(|invocation| invocation.program.as_str())
        .collect();
    assert_eq!(
        programs,
        vec!["ssh", "ssh", "ssh", "rsync", "ssh", "ssh", "ssh"]
    );
    let commands = runner.remote_commands();
    let mut iter = commands.iter().map(String::as_str);
    assert_eq!(
        iter.next(),
        Some("sudo -H bash -c 'curl -L https://www.opscode.com/chef/install.sh | bash'")
    );
    assert_eq!(iter.next(), Some("mkdir -p /tmp/chef-solo"));
    assert_eq!(iter.next(), Some("mkdir -p /tmp/chef-solo/cookbooks"));
    assert_eq!(
        iter.next(),
        Some("ubuntu@biolinux.test:/tmp/chef-solo/cookbooks")
    );
    assert!(iter.next().is_some_and(|cmd| cmd.ends_with("> /tmp/chef-solo/solo.rb")));
    assert!(iter.next().is_some_and(
        |cmd| cmd.contains("recipe[galaxy]") && cmd.ends_with("> /tmp/chef-solo/node.json")
    ));
    assert_eq!(
        iter.next(),
        Some("sudo -H bash -c 'cd /tmp/chef-solo && chef-solo -c solo.rb -j node.json'")
    );
}

#[rstest]
fn solo_rb_points_at_uploaded_repository() {
    let solo = ChefSolo::solo_rb();

    assert!(solo.contains("cookbook_path \"/tmp/chef-solo/cookbooks\""));
    assert!(solo.contains("role_path \"/tmp/chef-solo/roles\""));
}
