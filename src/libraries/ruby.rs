//! Ruby gems installed or updated with `gem`.

use std::collections::BTreeSet;

use serde::Deserialize;
use shell_escape::unix::escape;
use tracing::debug;

use super::{LibraryCategory, LibraryInstaller, parse_config, rewrite};
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::flavor::Flavor;
use crate::remote::RemoteError;

/// Contents of `ruby-libs.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct RubyLibraries {
    /// Gem names.
    #[serde(default)]
    pub gems: Vec<String>,
}

/// Installs `ruby-libs`.
///
/// The installed gem list is queried once up front and again only when a
/// gem is missing from the cached list. Gems installed between those
/// queries by something other than this installer can go unnoticed, in
/// which case `gem install` runs for a gem that is already present.
#[derive(Clone, Copy, Debug, Default)]
pub struct RubyInstaller;

fn installed_gems(context: &InstallContext<'_>) -> Result<BTreeSet<String>, RemoteError> {
    let listing = context.run(&format!(
        "gem{} list --no-versions",
        context.env.ruby_suffix()
    ))?;
    Ok(listing
        .lines()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

impl LibraryInstaller for RubyInstaller {
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &serde_yaml::Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let libraries: RubyLibraries = parse_config("ruby-libs.yaml", config)?;
        let gems = rewrite(flavor, LibraryCategory::Ruby, libraries.gems);
        let suffix = context.env.ruby_suffix();

        let mut installed = installed_gems(context)?;
        for gem in &gems {
            if !installed.contains(gem) {
                debug!(%gem, "gem not in cached list; refreshing");
                installed = installed_gems(context)?;
            }
            let action = if installed.contains(gem) {
                "update"
            } else {
                "install"
            };
            context.safe_sudo(&format!("gem{suffix} {action} {}", escape(gem.into())))?;
        }
        Ok(())
    }
}
