//! Hackage libraries installed globally with `cabal`.

use serde::Deserialize;
use shell_escape::unix::escape;

use super::{LibraryCategory, LibraryInstaller, parse_config, rewrite};
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::flavor::Flavor;

/// Contents of `haskell-libs.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct HaskellLibraries {
    /// Hackage package names.
    #[serde(default)]
    pub cabal: Vec<String>,
}

/// Installs `haskell-libs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HaskellInstaller;

impl LibraryInstaller for HaskellInstaller {
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &serde_yaml::Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let libraries: HaskellLibraries = parse_config("haskell-libs.yaml", config)?;
        let packages = rewrite(flavor, LibraryCategory::Haskell, libraries.cabal);

        context.run("cabal update")?;
        let root_cmd = if context.env.use_sudo {
            " --root-cmd=sudo"
        } else {
            ""
        };
        for package in packages {
            context.run(&format!(
                "cabal install{root_cmd} --global {}",
                escape(package.into())
            ))?;
        }
        Ok(())
    }
}
