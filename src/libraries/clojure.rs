//! Clojure libraries installed with `cljr`.

use serde::Deserialize;
use shell_escape::unix::escape;

use super::{LibraryCategory, LibraryInstaller, parse_config, rewrite};
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::flavor::Flavor;

/// Contents of `clojure-libs.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ClojureLibraries {
    /// Library coordinates understood by `cljr install`.
    #[serde(default)]
    pub cljr: Vec<String>,
}

/// Installs `clojure-libs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClojureInstaller;

impl LibraryInstaller for ClojureInstaller {
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &serde_yaml::Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let libraries: ClojureLibraries = parse_config("clojure-libs.yaml", config)?;
        for library in rewrite(flavor, LibraryCategory::Clojure, libraries.cljr) {
            context.run(&format!("cljr install {}", escape(library.into())))?;
        }
        Ok(())
    }
}
