//! System packages from the distribution package manager and nix.

use std::time::SystemTime;

use humantime::format_rfc3339_seconds;
use shell_escape::unix::escape;
use tracing::info;

use crate::config::ConfigError;
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::files::ConfigFiles;
use crate::manifest::PackageGroups;
use crate::remote::ExecMode;

mod nix;

pub use nix::{NIX_CHANNEL_URL, NIX_GROUP_FILE, install_nix_packages};

/// Distribution package managers the installer can drive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PackageManager {
    /// Debian and Ubuntu.
    Apt,
    /// Red Hat derivatives.
    Yum,
}

impl PackageManager {
    /// Picks the package manager for `distribution`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unsupported`] for unknown distributions.
    pub fn for_distribution(distribution: &str) -> Result<Self, ConfigError> {
        match distribution.trim().to_ascii_lowercase().as_str() {
            "ubuntu" | "debian" => Ok(Self::Apt),
            "centos" | "scientificlinux" | "fedora" => Ok(Self::Yum),
            _ => Err(ConfigError::Unsupported {
                field: "distribution",
                value: distribution.to_owned(),
            }),
        }
    }

    /// Group file listing this manager's packages.
    #[must_use]
    pub const fn group_file(self) -> &'static str {
        match self {
            Self::Apt => "packages.yaml",
            Self::Yum => "packages-yum.yaml",
        }
    }

    /// Commands installing `packages`; empty when there is nothing to do.
    #[must_use]
    pub fn install_commands(self, packages: &[String]) -> Vec<String> {
        if packages.is_empty() {
            return Vec::new();
        }
        let names = join_escaped(packages);
        match self {
            Self::Apt => vec![
                String::from("apt-get update"),
                format!("DEBIAN_FRONTEND=noninteractive apt-get -y install {names}"),
            ],
            Self::Yum => vec![format!("yum -y install {names}")],
        }
    }

    /// Command emptying the download cache.
    #[must_use]
    pub const fn clean_command(self) -> &'static str {
        match self {
            Self::Apt => "apt-get clean",
            Self::Yum => "yum clean all",
        }
    }
}

pub(crate) fn join_escaped(items: &[String]) -> String {
    items
        .iter()
        .map(|item| escape(item.into()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Installs the distribution packages of the selected `groups`.
///
/// # Errors
///
/// Returns [`InstallError`] for an unsupported distribution, a missing or
/// malformed group file, or a failing install.
pub fn install_native_packages(
    context: &InstallContext<'_>,
    files: &ConfigFiles,
    groups: &[String],
) -> Result<(), InstallError> {
    let manager = PackageManager::for_distribution(&context.env.distribution)?;
    let resolved = PackageGroups::load(files, manager.group_file())?.resolve(Some(groups), &[])?;
    info!(
        ?manager,
        count = resolved.packages.len(),
        "installing distribution packages"
    );
    for command in manager.install_commands(&resolved.packages) {
        context.sudo(&command)?;
    }
    Ok(())
}

/// Appends a line recording this run to the remote install log.
///
/// # Errors
///
/// Returns [`InstallError::Remote`] when the log cannot be written.
pub fn record_install(
    context: &InstallContext<'_>,
    target: Option<&str>,
    flavor: &str,
) -> Result<(), InstallError> {
    let line = format!(
        "{} biolinux install target={} flavor={flavor}",
        format_rfc3339_seconds(SystemTime::now()),
        target.unwrap_or("all"),
    );
    let command = format!(
        "echo {} >> {}",
        escape(line.into()),
        context.env.install_log
    );
    context.remote.checked(&command, ExecMode::Sudo)?;
    Ok(())
}
