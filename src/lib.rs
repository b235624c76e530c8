//! Core library for the biolinux provisioning tool.
//!
//! The crate installs a curated software stack onto a remote host over SSH:
//! distribution packages, custom-built programs, chef recipes and language
//! libraries, driven by YAML configuration and an optional flavor. Every
//! step is a shell command handed to a [`RemoteExecutor`], so runs can be
//! rehearsed with the [`DryRunExecutor`].

pub mod chef;
pub mod cleanup;
pub mod cloudman;
pub mod config;
pub mod context;
pub mod custom;
pub mod error;
pub mod files;
pub mod flavor;
pub mod install;
pub mod jsonc;
pub mod libraries;
pub mod manifest;
pub mod packages;
pub mod remote;
pub mod test_support;
pub mod timing;

pub use cloudman::{CloudmanError, CloudmanOptions, LaunchSpec};
pub use config::{ConfigError, RunEnvironment};
pub use context::InstallContext;
pub use custom::CustomRegistry;
pub use error::{InstallError, ResolutionError};
pub use files::{ConfigFiles, FilesError};
pub use flavor::{ConfiguredFlavor, DefaultFlavor, Flavor};
pub use install::{InstallOrchestrator, Phase, UnknownPhase};
pub use libraries::{InstallerRegistry, LibraryCategory, LibraryInstaller};
pub use manifest::{InstallManifest, ManifestError, PackageGroups, ResolvedPackages};
pub use remote::{
    DryRunExecutor, ExecMode, ProcessCommandRunner, RemoteError, RemoteExecutor, SshExecutor,
    SshTarget,
};
