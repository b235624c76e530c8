//! Flavor profiles that customise a run.
//!
//! A flavor may replace configuration files (see [`crate::files`]), rewrite
//! the item lists installers are about to act on, and run extra commands
//! once everything is installed. Rewrites are declared in an optional
//! `flavor.yaml` inside the flavor directory:
//!
//! ```yaml
//! name: minimal
//! rewrite:
//!   python:
//!     drop: [numpy]
//!     rename: { biopython: "biopython==1.81" }
//!     append: [pysam]
//! post_install:
//!   - "echo done"
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info};

use crate::context::InstallContext;
use crate::files::{ConfigFiles, FilesError, read_yaml_path};
use crate::remote::RemoteError;

/// Logical name of the flavor description inside a flavor directory.
pub const FLAVOR_FILE: &str = "flavor.yaml";

/// Hooks a flavor exposes to the installers.
pub trait Flavor {
    /// Human-readable flavor name, recorded in the install log.
    fn name(&self) -> &str;

    /// Rewrites `items` of `category` before an installer iterates them.
    fn rewrite_config_items(&self, category: &str, items: Vec<String>) -> Vec<String>;

    /// Runs after every other phase, receiving the manifest's package
    /// groups.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when a post-install command fails.
    fn post_install(
        &self,
        context: &InstallContext<'_>,
        package_groups: &[String],
    ) -> Result<(), RemoteError>;
}

/// Flavor used when none is selected: no rewrites, no post-install steps.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFlavor;

impl Flavor for DefaultFlavor {
    fn name(&self) -> &str {
        "default"
    }

    fn rewrite_config_items(&self, _category: &str, items: Vec<String>) -> Vec<String> {
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

/// Edits applied to one category's item list, in field order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ItemRewrite {
    /// Items removed from the list.
    #[serde(default)]
    pub drop: Vec<String>,
    /// Items replaced in place by another name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Items added at the end unless already present.
    #[serde(default)]
    pub append: Vec<String>,
}

impl ItemRewrite {
    fn apply(&self, items: Vec<String>) -> Vec<String> {
        let mut rewritten: Vec<String> = items
            .into_iter()
            .filter(|item| !self.drop.contains(item))
            .map(|item| self.rename.get(&item).cloned().unwrap_or(item))
            .collect();
        for extra in &self.append {
            if !rewritten.contains(extra) {
                rewritten.push(extra.clone());
            }
        }
        rewritten
    }
}

/// Flavor described by a directory and its optional `flavor.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfiguredFlavor {
    /// Flavor name.
    #[serde(default)]
    pub name: String,
    /// Item rewrites keyed by category (`python`, `custom`, ...).
    #[serde(default)]
    pub rewrite: BTreeMap<String, ItemRewrite>,
    /// Commands run as the login user after installation.
    #[serde(default)]
    pub post_install: Vec<String>,
}

impl Flavor for ConfiguredFlavor {
    fn name(&self) -> &str {
        &self.name
    }

    fn rewrite_config_items(&self, category: &str, items: Vec<String>) -> Vec<String> {
        match self.rewrite.get(category) {
            Some(rewrite) => {
                debug!(flavor = %self.name, category, "rewriting items");
                rewrite.apply(items)
            }
            None => items,
        }
    }

    fn post_install(
        &self,
        context: &InstallContext<'_>,
        package_groups: &[String],
    ) -> Result<(), RemoteError> {
        info!(
            flavor = %self.name,
            groups = %package_groups.join(","),
            "running flavor post-install"
        );
        for command in &self.post_install {
            context.run(command)?;
        }
        Ok(())
    }
}

/// Loads the flavor selected in `files`.
///
/// Without a flavor directory the [`DefaultFlavor`] applies. A flavor
/// directory without `flavor.yaml` is named after the directory and has no
/// hooks.
///
/// # Errors
///
/// Returns [`FilesError`] when `flavor.yaml` exists but cannot be parsed.
pub fn load(files: &ConfigFiles) -> Result<Box<dyn Flavor>, FilesError> {
    let Some(dir) = files.flavor_dir() else {
        return Ok(Box::new(DefaultFlavor));
    };
    let fallback_name = dir.file_name().unwrap_or(dir.as_str()).to_owned();
    let description = dir.join(FLAVOR_FILE);

    let mut flavor = if files.find(FLAVOR_FILE)?.as_deref() == Some(description.as_path()) {
        read_yaml_path::<Option<ConfiguredFlavor>>(&description)?.unwrap_or_default()
    } else {
        ConfiguredFlavor::default()
    };
    if flavor.name.trim().is_empty() {
        flavor.name = fallback_name;
    }
    info!(flavor = %flavor.name, dir = %dir, "loaded flavor");
    Ok(Box::new(flavor))
}
