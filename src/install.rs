//! The fixed sequence of install phases.
//!
//! A full run executes every [`Phase`] once, in declaration order. A target
//! restricts the run to a single phase. The first failure aborts the run;
//! nothing already installed is rolled back.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::cleanup::{cleanup_space, prepare_ec2_image};
use crate::config::RunEnvironment;
use crate::context::InstallContext;
use crate::custom::CustomRegistry;
use crate::error::InstallError;
use crate::files::ConfigFiles;
use crate::flavor::{self, Flavor};
use crate::libraries::{InstallerRegistry, LibraryCategory};
use crate::manifest::{InstallManifest, PackageGroups};
use crate::packages::{install_native_packages, install_nix_packages, record_install};
use crate::remote::RemoteExecutor;
use crate::timing::timed;

/// Group file listing custom-built programs.
pub const CUSTOM_GROUPS: &str = "custom.yaml";

/// Group file listing chef recipes.
pub const CHEF_RECIPE_GROUPS: &str = "chef_recipes.yaml";

/// Install phases in execution order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Phase {
    /// Distribution and nix packages.
    Packages,
    /// Programs built by custom install functions.
    Custom,
    /// Chef recipes.
    ChefRecipes,
    /// Language libraries.
    Libraries,
    /// Flavor post-install hook.
    PostInstall,
    /// Space cleanup and image preparation.
    Cleanup,
}

/// Raised when a target names no phase.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown install target {0}; expected one of packages, custom, chef_recipes, libraries, post_install, cleanup")]
pub struct UnknownPhase(pub String);

impl Phase {
    /// Every phase in execution order.
    pub const ALL: [Self; 6] = [
        Self::Packages,
        Self::Custom,
        Self::ChefRecipes,
        Self::Libraries,
        Self::PostInstall,
        Self::Cleanup,
    ];

    /// Target name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::Custom => "custom",
            Self::ChefRecipes => "chef_recipes",
            Self::Libraries => "libraries",
            Self::PostInstall => "post_install",
            Self::Cleanup => "cleanup",
        }
    }

    /// Phases selected by `target`: all of them for `None`.
    #[must_use]
    pub fn selected(target: Option<Self>) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|phase| target.is_none_or(|wanted| wanted == *phase))
            .collect()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| UnknownPhase(value.to_owned()))
    }
}

/// Runs install phases and direct installs against one target.
pub struct InstallOrchestrator<'a> {
    context: InstallContext<'a>,
    files: ConfigFiles,
    flavor: Box<dyn Flavor>,
    libraries: InstallerRegistry,
    custom: CustomRegistry,
}

impl fmt::Debug for InstallOrchestrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallOrchestrator")
            .field("context", &self.context)
            .field("files", &self.files)
            .field("flavor", &self.flavor.name())
            .field("libraries", &self.libraries)
            .field("custom", &self.custom)
            .finish()
    }
}

impl<'a> InstallOrchestrator<'a> {
    /// Prepares a run: validates `env`, resolves the configuration
    /// directory and flavor, and installs the standard registries.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when the environment is invalid or the
    /// flavor cannot be loaded.
    pub fn new(
        env: &'a RunEnvironment,
        remote: &'a dyn RemoteExecutor,
    ) -> Result<Self, InstallError> {
        env.validate()?;
        let mut files = ConfigFiles::new(env.config_dir());
        if let Some(selected) = env.flavor.as_deref() {
            files = files.with_flavor(selected)?;
        }
        let flavor = flavor::load(&files)?;
        Ok(Self {
            context: InstallContext::new(env, remote),
            files,
            flavor,
            libraries: InstallerRegistry::standard(),
            custom: CustomRegistry::standard(),
        })
    }

    /// Replaces the library installer registry.
    #[must_use]
    pub fn with_library_registry(mut self, registry: InstallerRegistry) -> Self {
        self.libraries = registry;
        self
    }

    /// Replaces the custom install registry.
    #[must_use]
    pub fn with_custom_registry(mut self, registry: CustomRegistry) -> Self {
        self.custom = registry;
        self
    }

    /// Returns the configuration file resolver in use.
    #[must_use]
    pub const fn files(&self) -> &ConfigFiles {
        &self.files
    }

    /// Returns the active flavor.
    #[must_use]
    pub fn flavor(&self) -> &dyn Flavor {
        self.flavor.as_ref()
    }

    /// Runs every phase, or only `target`, in the fixed order.
    ///
    /// # Errors
    ///
    /// Returns the first [`InstallError`] raised by any phase.
    pub fn install(&self, target: Option<Phase>) -> Result<(), InstallError> {
        timed("install", || {
            info!(
                host = %self.context.env.host,
                target = target.map_or("all", Phase::as_str),
                flavor = self.flavor.name(),
                "starting install"
            );
            let manifest = InstallManifest::load(&self.files)?;
            for phase in Phase::selected(target) {
                timed(&format!("{phase} phase"), || {
                    self.run_phase(phase, target, &manifest)
                })?;
            }
            Ok(())
        })
    }

    fn run_phase(
        &self,
        phase: Phase,
        target: Option<Phase>,
        manifest: &InstallManifest,
    ) -> Result<(), InstallError> {
        let context = &self.context;
        match phase {
            Phase::Packages => {
                install_native_packages(context, &self.files, &manifest.packages)?;
                if context.env.nixpkgs {
                    install_nix_packages(context, &self.files, &manifest.packages)?;
                }
                record_install(context, target.map(Phase::as_str), self.flavor.name())
            }
            Phase::Custom => self.custom_phase(manifest),
            Phase::ChefRecipes => self.chef_phase(manifest),
            Phase::Libraries => {
                for group in &manifest.libraries {
                    self.libraries
                        .install(context, &self.files, group, self.flavor.as_ref())?;
                }
                Ok(())
            }
            Phase::PostInstall => self
                .flavor
                .post_install(context, &manifest.packages)
                .map_err(InstallError::from),
            Phase::Cleanup => {
                cleanup_space(context)?;
                if context.env.is_ec2_image {
                    prepare_ec2_image(context)?;
                }
                Ok(())
            }
        }
    }

    fn custom_phase(&self, manifest: &InstallManifest) -> Result<(), InstallError> {
        let local_install = &self.context.env.local_install;
        if !self.context.exists(local_install)? {
            self.context.run(&format!("mkdir -p {local_install}"))?;
        }

        let resolved = PackageGroups::load(&self.files, CUSTOM_GROUPS)?
            .resolve(Some(&manifest.packages), &manifest.custom_ignore)?;
        let packages = self
            .flavor
            .rewrite_config_items("custom", resolved.packages);
        debug!(packages = %packages.join(","), "custom installs");
        for package in &packages {
            self.custom
                .install(&self.context, package, &resolved.package_to_group)?;
        }
        Ok(())
    }

    fn chef_phase(&self, manifest: &InstallManifest) -> Result<(), InstallError> {
        let resolved = PackageGroups::load(&self.files, CHEF_RECIPE_GROUPS)?
            .resolve(Some(&manifest.packages), &manifest.custom_ignore)?;
        let recipes = self
            .flavor
            .rewrite_config_items("chef_recipes", resolved.packages);
        if recipes.is_empty() {
            info!("no chef recipes selected");
            return Ok(());
        }
        crate::chef::install_chef_recipes(&self.context, &self.files, &recipes)
    }

    /// Installs one custom program by name, outside the phase sequence.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when `custom.yaml` cannot be read, the name
    /// does not resolve, or the install fails.
    pub fn install_custom(&self, package: &str) -> Result<(), InstallError> {
        let resolved = PackageGroups::load(&self.files, CUSTOM_GROUPS)?.resolve(None, &[])?;
        self.custom
            .install(&self.context, package, &resolved.package_to_group)
    }

    /// Converges `recipes` with chef-solo, outside the phase sequence.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when provisioning fails.
    pub fn install_chef_recipes(&self, recipes: &[String]) -> Result<(), InstallError> {
        crate::chef::install_chef_recipes(&self.context, &self.files, recipes)
    }

    /// Installs the libraries of one language (`r`, `python`, ...) outside
    /// the phase sequence.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] for an unknown language or a failing
    /// install.
    pub fn install_libraries(&self, language: &str) -> Result<(), InstallError> {
        let group = language.parse::<LibraryCategory>().map_or_else(
            |_| format!("{language}-libs"),
            |category| category.group_name().to_owned(),
        );
        timed(&format!("{group} install"), || {
            self.libraries
                .install(&self.context, &self.files, &group, self.flavor.as_ref())
        })
    }
}
