//! Dispatch of custom-built programs to their install functions.
//!
//! Programs listed in `custom.yaml` cannot come from a package manager.
//! Each is installed by a function registered under a module name (the
//! owning group in `custom.yaml`, or the program name itself) and a
//! function name of the form `install_<program>`.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::context::InstallContext;
use crate::error::{InstallError, ResolutionError};
use crate::timing::timed;

pub mod bio_nextgen;
pub mod build;

/// Signature of a custom install function.
pub type CustomInstallFn = fn(&InstallContext<'_>) -> Result<(), InstallError>;

/// Install functions grouped by module name.
#[derive(Clone, Default)]
pub struct CustomRegistry {
    modules: BTreeMap<String, BTreeMap<String, CustomInstallFn>>,
}

impl fmt::Debug for CustomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (module, functions) in &self.modules {
            map.entry(module, &functions.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

/// Returns the conventional install function name for `package`.
///
/// # Examples
///
/// ```
/// # use biolinux::custom::install_function_name;
/// assert_eq!(install_function_name("Bowtie-2"), "install_bowtie_2");
/// ```
#[must_use]
pub fn install_function_name(package: &str) -> String {
    format!("install_{}", package.to_lowercase().replace('-', "_"))
}

impl CustomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in modules.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        bio_nextgen::register(&mut registry);
        registry
    }

    /// Registers `function` as `module.name`.
    pub fn register(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        function: CustomInstallFn,
    ) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(name.into(), function);
    }

    /// Resolves `package` to its module name and install function.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownModule`] or
    /// [`ResolutionError::UnknownFunction`] when nothing is registered.
    pub fn resolve(
        &self,
        package: &str,
        package_to_group: &BTreeMap<String, String>,
    ) -> Result<(String, CustomInstallFn), ResolutionError> {
        let name = package.to_lowercase();
        let module = package_to_group
            .get(&name)
            .cloned()
            .unwrap_or_else(|| name.clone());
        let function = install_function_name(&name);
        debug!(%name, %module, %function, "resolving custom install");

        let functions =
            self.modules
                .get(&module)
                .ok_or_else(|| ResolutionError::UnknownModule {
                    module: module.clone(),
                    package: package.to_owned(),
                })?;
        let install = functions
            .get(&function)
            .copied()
            .ok_or_else(|| ResolutionError::UnknownFunction {
                module: module.clone(),
                function,
            })?;
        Ok((module, install))
    }

    /// Resolves and runs the install function for `package`, logging
    /// start, end and elapsed time.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Resolution`] without touching the target
    /// when `package` cannot be resolved, or the install function's error.
    pub fn install(
        &self,
        context: &InstallContext<'_>,
        package: &str,
        package_to_group: &BTreeMap<String, String>,
    ) -> Result<(), InstallError> {
        let (module, install) = self.resolve(package, package_to_group)?;
        let label = format!("custom install for '{}'", package.to_lowercase());
        timed(&label, || {
            info!(%module, "installing {package}");
            install(context)
        })
    }
}

#[cfg(test)]
mod tests;
