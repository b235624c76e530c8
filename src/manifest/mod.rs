//! Install manifest and package group resolution.
//!
//! `main.yaml` names the package groups and library groups to install for a
//! run. Group files such as `custom.yaml` or `packages.yaml` map each group
//! name to its members; [`PackageGroups::resolve`] flattens the selected
//! groups into an ordered install list.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::files::{ConfigFiles, FilesError};

mod groups;

pub use groups::{PackageGroups, ResolvedPackages};

/// Logical name of the top-level manifest.
pub const MAIN_MANIFEST: &str = "main.yaml";

/// Errors raised while loading manifests and group files.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Raised when a file cannot be located, read or parsed.
    #[error(transparent)]
    Files(#[from] FilesError),
    /// Raised when a group holds a value that is not a list, mapping or
    /// scalar package name.
    #[error("group {group} in {file} has an invalid entry: {detail}")]
    InvalidGroup {
        /// Logical file holding the group.
        file: String,
        /// Group name.
        group: String,
        /// Description of the offending value.
        detail: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    packages: Option<Vec<String>>,
    #[serde(default)]
    libraries: Option<Vec<String>>,
    #[serde(default)]
    custom_ignore: Option<Vec<String>>,
}

/// Package and library groups selected for a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstallManifest {
    /// Package group names in declared order.
    pub packages: Vec<String>,
    /// Library group names, sorted.
    pub libraries: Vec<String>,
    /// Package names excluded from bulk custom and chef installs.
    pub custom_ignore: Vec<String>,
}

impl InstallManifest {
    /// Loads `main.yaml` through `files`. Missing or empty keys default to
    /// empty lists; library groups are sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Files`] when the manifest is missing or
    /// malformed.
    pub fn load(files: &ConfigFiles) -> Result<Self, ManifestError> {
        let path = files.resolve(MAIN_MANIFEST)?;
        let raw: Option<RawManifest> = crate::files::read_yaml_path(&path)?;
        let manifest = Self::from_raw(raw.unwrap_or_default());
        info!(
            packages = %manifest.packages.join(","),
            libraries = %manifest.libraries.join(","),
            %path,
            "loaded install manifest"
        );
        Ok(manifest)
    }

    fn from_raw(raw: RawManifest) -> Self {
        let mut libraries = raw.libraries.unwrap_or_default();
        libraries.sort();
        Self {
            packages: raw.packages.unwrap_or_default(),
            libraries,
            custom_ignore: raw.custom_ignore.unwrap_or_default(),
        }
    }

    /// Returns `true` when `package` is on the ignore list.
    #[must_use]
    pub fn is_ignored(&self, package: &str) -> bool {
        self.custom_ignore.iter().any(|ignored| ignored == package)
    }
}

#[cfg(test)]
mod tests;
