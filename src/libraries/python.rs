//! Python packages installed with `pip`.

use serde::Deserialize;
use shell_escape::unix::escape;

use super::{LibraryCategory, LibraryInstaller, parse_config, rewrite};
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::flavor::Flavor;

/// Contents of `python-libs.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct PythonLibraries {
    /// `PyPI` requirement strings.
    #[serde(default)]
    pub pypi: Vec<String>,
}

/// Installs `python-libs`: bootstraps `pip`, then upgrades each package.
#[derive(Clone, Copy, Debug, Default)]
pub struct PythonInstaller;

impl LibraryInstaller for PythonInstaller {
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &serde_yaml::Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let libraries: PythonLibraries = parse_config("python-libs.yaml", config)?;
        let packages = rewrite(flavor, LibraryCategory::Python, libraries.pypi);

        context.safe_sudo(&format!(
            "easy_install{} -U pip",
            context.env.python_suffix()
        ))?;
        for package in &packages {
            context.safe_sudo(&format!(
                "{} install --upgrade {}",
                context.env.pip_cmd,
                escape(package.into())
            ))?;
        }
        Ok(())
    }
}
