//! Tests for manifest loading and group resolution.

use std::fs;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

const CUSTOM_YAML: &str = "\
bio_nextgen:
  - bwa
  - samtools
  - bowtie2
distributed:
  - cloudman
utilities:
  editors:
    - vim
  shells:
    - zsh
";

fn groups() -> PackageGroups {
    let value = serde_yaml::from_str(CUSTOM_YAML).unwrap_or_else(|err| panic!("yaml: {err}"));
    PackageGroups::from_value("custom.yaml", value).unwrap_or_else(|err| panic!("groups: {err}"))
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

struct ConfigDir {
    _tmp: TempDir,
    files: ConfigFiles,
    root: Utf8PathBuf,
}

#[fixture]
fn config_dir() -> ConfigDir {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    ConfigDir {
        _tmp: tmp,
        files: ConfigFiles::new(root.clone()),
        root,
    }
}

#[rstest]
fn resolve_flattens_selected_groups_in_file_order() {
    let resolved = groups()
        .resolve(Some(&names(&["utilities", "bio_nextgen"])), &[])
        .expect("resolve");

    assert_eq!(
        resolved.packages,
        names(&["bwa", "samtools", "bowtie2", "vim", "zsh"])
    );
    assert_eq!(
        resolved.package_to_group.get("zsh").map(String::as_str),
        Some("utilities")
    );
    assert!(!resolved.package_to_group.contains_key("cloudman"));
}

#[rstest]
fn resolve_without_selection_covers_every_group() {
    let resolved = groups().resolve(None, &[]).expect("resolve");

    assert_eq!(resolved.packages.len(), 6);
    assert_eq!(
        resolved.package_to_group.get("cloudman").map(String::as_str),
        Some("distributed")
    );
}

#[rstest]
#[case(&["samtools"])]
#[case(&["bwa", "zsh"])]
#[case(&["bwa", "samtools", "bowtie2", "cloudman", "vim", "zsh"])]
fn ignored_packages_keep_group_mapping(#[case] ignored_names: &[&str]) {
    let ignore = names(ignored_names);

    let resolved = groups().resolve(None, &ignore).expect("resolve");

    for ignored in &ignore {
        assert!(
            !resolved.packages.contains(ignored),
            "{ignored} should be filtered from {:?}",
            resolved.packages
        );
        assert!(
            resolved.package_to_group.contains_key(ignored),
            "{ignored} should stay in the reverse mapping"
        );
    }
}

#[rstest]
fn resolve_is_deterministic_across_loads(config_dir: ConfigDir) {
    fs::write(config_dir.root.join("custom.yaml"), CUSTOM_YAML)
        .unwrap_or_else(|err| panic!("write: {err}"));
    let selected = names(&["bio_nextgen", "utilities"]);
    let ignore = names(&["vim"]);

    let first = PackageGroups::load(&config_dir.files, "custom.yaml")
        .expect("first load")
        .resolve(Some(&selected), &ignore)
        .expect("resolve");
    let second = PackageGroups::load(&config_dir.files, "custom.yaml")
        .expect("second load")
        .resolve(Some(&selected), &ignore)
        .expect("resolve");

    assert_eq!(first, second);
    assert_eq!(first.packages, names(&["bwa", "samtools", "bowtie2", "zsh"]));
}

#[rstest]
fn shared_member_keeps_first_position_and_group() {
    let value = serde_yaml::from_str("alpha:\n  - bwa\n  - samtools\nbeta:\n  - bwa\n")
        .unwrap_or_else(|err| panic!("yaml: {err}"));
    let shared = PackageGroups::from_value("custom.yaml", value).expect("groups");

    let resolved = shared.resolve(None, &[]).expect("resolve");

    assert_eq!(resolved.packages, names(&["bwa", "samtools"]));
    assert_eq!(
        resolved.package_to_group.get("bwa").map(String::as_str),
        Some("alpha")
    );
}

#[rstest]
fn unknown_selected_group_is_skipped() {
    let resolved = groups()
        .resolve(Some(&names(&["not_a_group"])), &[])
        .expect("resolve");

    assert_eq!(resolved, ResolvedPackages::default());
}

#[rstest]
#[case("tools: bwa\n")]
#[case("tools:\n  - [nested]\n")]
fn invalid_group_members_are_rejected(#[case] yaml: &str) {
    let value = serde_yaml::from_str(yaml).unwrap_or_else(|err| panic!("yaml: {err}"));
    let groups = PackageGroups::from_value("custom.yaml", value).expect("root is a mapping");

    let err = groups.resolve(None, &[]).expect_err("should reject");

    assert!(
        matches!(err, ManifestError::InvalidGroup { ref group, .. } if group == "tools"),
        "got {err:?}"
    );
}

#[rstest]
fn numeric_members_are_rendered_as_text() {
    let value = serde_yaml::from_str("python:\n  - 3\n").unwrap_or_else(|err| panic!("{err}"));
    let groups = PackageGroups::from_value("packages.yaml", value).expect("groups");

    let resolved = groups.resolve(None, &[]).expect("resolve");

    assert_eq!(resolved.packages, names(&["3"]));
}

#[rstest]
fn manifest_defaults_missing_keys_and_sorts_libraries(config_dir: ConfigDir) {
    fs::write(
        config_dir.root.join(MAIN_MANIFEST),
        "packages:\n  - bio_nextgen\n  - distributed\nlibraries:\n  - ruby-libs\n  - r-libs\n",
    )
    .unwrap_or_else(|err| panic!("write: {err}"));

    let manifest = InstallManifest::load(&config_dir.files).expect("manifest");

    assert_eq!(manifest.packages, names(&["bio_nextgen", "distributed"]));
    assert_eq!(manifest.libraries, names(&["r-libs", "ruby-libs"]));
    assert!(manifest.custom_ignore.is_empty());
}

#[rstest]
fn manifest_treats_null_lists_as_empty(config_dir: ConfigDir) {
    fs::write(
        config_dir.root.join(MAIN_MANIFEST),
        "packages:\nlibraries:\ncustom_ignore:\n  - cloudman\n",
    )
    .unwrap_or_else(|err| panic!("write: {err}"));

    let manifest = InstallManifest::load(&config_dir.files).expect("manifest");

    assert!(manifest.packages.is_empty());
    assert!(manifest.libraries.is_empty());
    assert!(manifest.is_ignored("cloudman"));
}

#[rstest]
fn missing_manifest_is_a_configuration_error(config_dir: ConfigDir) {
    let err = InstallManifest::load(&config_dir.files).expect_err("no main.yaml");

    assert!(
        matches!(err, ManifestError::Files(FilesError::Missing { .. })),
        "got {err:?}"
    );
}
