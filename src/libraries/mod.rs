//! Language library installers and their dispatch table.
//!
//! Each library group named in `main.yaml` (`r-libs`, `python-libs`, ...)
//! has a matching `<group>.yaml` file and a [`LibraryInstaller`] registered
//! under the group name in an [`InstallerRegistry`]. The orchestrator only
//! knows the registry; new installers can be registered without touching it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::context::InstallContext;
use crate::error::{InstallError, ResolutionError};
use crate::files::ConfigFiles;
use crate::flavor::Flavor;

mod clojure;
mod haskell;
mod perl;
mod python;
mod r;
mod ruby;

pub use clojure::ClojureInstaller;
pub use haskell::HaskellInstaller;
pub use perl::PerlInstaller;
pub use python::PythonInstaller;
pub use r::RInstaller;
pub use ruby::RubyInstaller;

/// The library groups shipped with the standard registry.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LibraryCategory {
    /// CRAN and Bioconductor packages.
    R,
    /// Packages from `PyPI`.
    Python,
    /// Ruby gems.
    Ruby,
    /// CPAN modules.
    Perl,
    /// Clojure libraries installed with `cljr`.
    Clojure,
    /// Hackage libraries installed with `cabal`.
    Haskell,
}

impl LibraryCategory {
    /// Every standard category.
    pub const ALL: [Self; 6] = [
        Self::R,
        Self::Python,
        Self::Ruby,
        Self::Perl,
        Self::Clojure,
        Self::Haskell,
    ];

    /// Language name handed to the flavor rewrite hook.
    #[must_use]
    pub const fn language(self) -> &'static str {
        match self {
            Self::R => "r",
            Self::Python => "python",
            Self::Ruby => "ruby",
            Self::Perl => "perl",
            Self::Clojure => "clojure",
            Self::Haskell => "haskell",
        }
    }

    /// Group name as written in `main.yaml`.
    #[must_use]
    pub const fn group_name(self) -> &'static str {
        match self {
            Self::R => "r-libs",
            Self::Python => "python-libs",
            Self::Ruby => "ruby-libs",
            Self::Perl => "perl-libs",
            Self::Clojure => "clojure-libs",
            Self::Haskell => "haskell-libs",
        }
    }
}

impl fmt::Display for LibraryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

impl FromStr for LibraryCategory {
    type Err = ResolutionError;

    /// Accepts either the group name (`ruby-libs`) or the language (`ruby`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| {
                category.group_name() == normalized || category.language() == normalized
            })
            .ok_or_else(|| ResolutionError::UnknownLibraryCategory {
                category: value.to_owned(),
            })
    }
}

/// Strategy installing one language's libraries.
pub trait LibraryInstaller {
    /// Installs everything listed in `config`, the parsed `<group>.yaml`.
    ///
    /// Implementations pass their item list through
    /// [`Flavor::rewrite_config_items`] exactly once before iterating.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] on a malformed config or on the first
    /// failing remote command.
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError>;
}

/// Maps library group names to installers.
#[derive(Default)]
pub struct InstallerRegistry {
    installers: BTreeMap<String, Box<dyn LibraryInstaller>>,
}

impl fmt::Debug for InstallerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerRegistry")
            .field("groups", &self.installers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InstallerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an installer for every [`LibraryCategory`].
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(LibraryCategory::R.group_name(), RInstaller);
        registry.register(LibraryCategory::Python.group_name(), PythonInstaller);
        registry.register(LibraryCategory::Ruby.group_name(), RubyInstaller);
        registry.register(LibraryCategory::Perl.group_name(), PerlInstaller);
        registry.register(LibraryCategory::Clojure.group_name(), ClojureInstaller);
        registry.register(LibraryCategory::Haskell.group_name(), HaskellInstaller);
        registry
    }

    /// Registers `installer` under `group`, replacing any previous entry.
    pub fn register(
        &mut self,
        group: impl Into<String>,
        installer: impl LibraryInstaller + 'static,
    ) {
        self.installers.insert(group.into(), Box::new(installer));
    }

    /// Registered group names, sorted.
    #[must_use]
    pub fn groups(&self) -> Vec<&str> {
        self.installers.keys().map(String::as_str).collect()
    }

    /// Looks up the installer for `group`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownLibraryCategory`] when nothing is
    /// registered under `group`.
    pub fn get(&self, group: &str) -> Result<&dyn LibraryInstaller, ResolutionError> {
        self.installers
            .get(group)
            .map(AsRef::as_ref)
            .ok_or_else(|| ResolutionError::UnknownLibraryCategory {
                category: group.to_owned(),
            })
    }

    /// Loads `<group>.yaml` through `files` and runs the matching installer.
    ///
    /// The installer is resolved before the file is read, so an unknown
    /// group fails without touching the file system or the target.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] for an unknown group, a missing or
    /// malformed file, or a failing install.
    pub fn install(
        &self,
        context: &InstallContext<'_>,
        files: &ConfigFiles,
        group: &str,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let installer = self.get(group)?;
        let config: Value = files.read_yaml(&format!("{group}.yaml"))?;
        info!(group, "installing libraries");
        installer.install(context, &config, flavor)
    }
}

/// Deserializes a per-language config, treating an empty document as the
/// default.
pub(crate) fn parse_config<T>(file: &str, config: &Value) -> Result<T, InstallError>
where
    T: DeserializeOwned + Default,
{
    if config.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(config.clone()).map_err(|err| InstallError::LibraryConfig {
        file: file.to_owned(),
        message: err.to_string(),
    })
}

/// Passes `items` through the flavor hook for `category`, logging the result.
pub(crate) fn rewrite(
    flavor: &dyn Flavor,
    category: LibraryCategory,
    items: Vec<String>,
) -> Vec<String> {
    let rewritten = flavor.rewrite_config_items(category.language(), items);
    debug!(%category, count = rewritten.len(), "library list after flavor rewrite");
    rewritten
}

#[cfg(test)]
mod tests;
