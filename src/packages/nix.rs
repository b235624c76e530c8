//! Packages from the nix package collection.

use shell_escape::unix::escape;
use tracing::info;

use crate::context::InstallContext;
use crate::error::InstallError;
use crate::files::ConfigFiles;
use crate::manifest::PackageGroups;

/// Channel providing the packages.
pub const NIX_CHANNEL_URL: &str = "http://nixos.org/channels/nixpkgs-unstable";

/// Group file listing nix packages.
pub const NIX_GROUP_FILE: &str = "nix.yaml";

/// Subscribes to the nix channel and installs the nix packages of the
/// selected `groups`, one `nix-env` call per package.
///
/// # Errors
///
/// Returns [`InstallError`] when `nix.yaml` is missing or malformed, or a
/// remote command fails.
pub fn install_nix_packages(
    context: &InstallContext<'_>,
    files: &ConfigFiles,
    groups: &[String],
) -> Result<(), InstallError> {
    let resolved = PackageGroups::load(files, NIX_GROUP_FILE)?.resolve(Some(groups), &[])?;

    context.sudo(&format!("nix-channel --add {NIX_CHANNEL_URL}"))?;
    context.sudo("nix-channel --update")?;
    info!(count = resolved.packages.len(), "installing nix packages");
    for package in &resolved.packages {
        context.sudo(&format!("nix-env -b -i {}", escape(package.into())))?;
    }
    Ok(())
}
