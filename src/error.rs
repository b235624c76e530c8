//! Crate-level error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::files::FilesError;
use crate::manifest::ManifestError;
use crate::remote::RemoteError;

/// Raised when a name does not map to anything the installer knows how to
/// run.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolutionError {
    /// No custom install module is registered under `module`.
    #[error("no custom install module {module} for {package}; register one to install it")]
    UnknownModule {
        /// Module key that was looked up.
        module: String,
        /// Package name as requested.
        package: String,
    },
    /// The module exists but lacks the conventional entry function.
    #[error("custom install module {module} has no function {function}")]
    UnknownFunction {
        /// Module key that was looked up.
        module: String,
        /// Function name that was looked up.
        function: String,
    },
    /// The library group has no registered installer.
    #[error("no library installer registered for {category}")]
    UnknownLibraryCategory {
        /// Category name as configured.
        category: String,
    },
}

/// Errors that abort a provisioning run.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Invalid run environment.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Missing or malformed configuration file.
    #[error("configuration error: {0}")]
    Files(#[from] FilesError),
    /// Missing or malformed manifest or group file.
    #[error("configuration error: {0}")]
    Manifest(#[from] ManifestError),
    /// Per-language library configuration does not match its installer.
    #[error("invalid {file}: {message}")]
    LibraryConfig {
        /// Logical file name.
        file: String,
        /// Deserialization error text.
        message: String,
    },
    /// Chef node attributes could not be assembled.
    #[error("invalid chef node attributes: {0}")]
    ChefAttributes(String),
    /// Unknown package, module, function or library category.
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    /// A remote command failed or could not be run.
    #[error("remote command failed: {0}")]
    Remote(#[from] RemoteError),
}
