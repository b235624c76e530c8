//! Resolution and parsing of configuration data files.
//!
//! Logical file names such as `main.yaml` or `node_extra.json` are looked up
//! in the flavor directory first and then in the base configuration
//! directory, so a flavor can replace any package list wholesale.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::jsonc;

/// Directory under the base configuration directory holding named flavors.
pub const FLAVOR_SUBDIRECTORY: &str = "flavor";

/// Errors raised while locating or parsing configuration files.
#[derive(Debug, Error)]
pub enum FilesError {
    /// Raised when no candidate location holds the requested file.
    #[error("configuration file {name} not found (searched: {searched})")]
    Missing {
        /// Logical file name.
        name: String,
        /// Comma-separated list of searched paths.
        searched: String,
    },
    /// Raised when a named flavor does not map to a directory.
    #[error("flavor {flavor} not found at {path}")]
    UnknownFlavor {
        /// Flavor name or path as supplied.
        flavor: String,
        /// Directory that was expected to exist.
        path: Utf8PathBuf,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when file content cannot be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Locates configuration files for a run, honouring flavor overrides.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigFiles {
    base: Utf8PathBuf,
    flavor_dir: Option<Utf8PathBuf>,
}

impl ConfigFiles {
    /// Uses `base` without any flavor overrides.
    #[must_use]
    pub fn new(base: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base: base.into(),
            flavor_dir: None,
        }
    }

    /// Applies `flavor`, which is either a directory path or the name of a
    /// directory under `<base>/flavor`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::UnknownFlavor`] when neither location is a
    /// directory.
    pub fn with_flavor(mut self, flavor: &str) -> Result<Self, FilesError> {
        let as_path = Utf8PathBuf::from(flavor);
        let candidate = if is_dir(&as_path) {
            as_path
        } else {
            self.base.join(FLAVOR_SUBDIRECTORY).join(flavor)
        };

        if !is_dir(&candidate) {
            return Err(FilesError::UnknownFlavor {
                flavor: flavor.to_owned(),
                path: candidate,
            });
        }

        debug!(flavor, dir = %candidate, "using flavor directory");
        self.flavor_dir = Some(candidate);
        Ok(self)
    }

    /// Returns the base configuration directory.
    #[must_use]
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    /// Returns the active flavor directory, if any.
    #[must_use]
    pub fn flavor_dir(&self) -> Option<&Utf8Path> {
        self.flavor_dir.as_deref()
    }

    fn candidates(&self, name: &str) -> Vec<Utf8PathBuf> {
        self.flavor_dir
            .iter()
            .map(|dir| dir.join(name))
            .chain(std::iter::once(self.base.join(name)))
            .collect()
    }

    /// Resolves `name` to an existing file, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] when a candidate cannot be inspected.
    pub fn find(&self, name: &str) -> Result<Option<Utf8PathBuf>, FilesError> {
        for candidate in self.candidates(name) {
            if path_exists(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Resolves `name` to an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Missing`] when no candidate exists.
    pub fn resolve(&self, name: &str) -> Result<Utf8PathBuf, FilesError> {
        self.find(name)?.ok_or_else(|| FilesError::Missing {
            name: name.to_owned(),
            searched: self
                .candidates(name)
                .iter()
                .map(|path| path.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Reads and deserializes the YAML file `name`.
    ///
    /// An empty document deserializes from YAML `null`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError`] when the file is missing, unreadable or
    /// malformed.
    pub fn read_yaml<T: DeserializeOwned>(&self, name: &str) -> Result<T, FilesError> {
        let path = self.resolve(name)?;
        read_yaml_path(&path)
    }

    /// Reads the JSON-with-comments file `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError`] when the file is missing, unreadable or
    /// malformed.
    pub fn read_jsonc(&self, name: &str) -> Result<serde_json::Value, FilesError> {
        let path = self.resolve(name)?;
        let contents = read_file(&path)?;
        jsonc::parse(&contents).map_err(|err| FilesError::Parse {
            path,
            message: err.to_string(),
        })
    }
}

/// Reads and deserializes a YAML file at an explicit path.
///
/// # Errors
///
/// Returns [`FilesError`] when the file is unreadable or malformed.
pub fn read_yaml_path<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, FilesError> {
    let contents = read_file(path)?;
    debug!(%path, "parsing YAML");
    serde_yaml::from_str(&contents).map_err(|err| FilesError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn split(path: &Utf8Path) -> Result<(&Utf8Path, &str), FilesError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| FilesError::Io {
        path: path.to_path_buf(),
        message: String::from("path is missing a file name"),
    })?;
    Ok((parent, file_name))
}

/// Reports whether `path` exists locally.
///
/// # Errors
///
/// Returns [`FilesError::Io`] when the parent directory cannot be
/// inspected.
pub fn path_exists(path: &Utf8Path) -> Result<bool, FilesError> {
    let (parent, file_name) = split(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name).map_err(|err| FilesError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FilesError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// Reports whether `path` is a readable local directory.
#[must_use]
pub fn is_dir(path: &Utf8Path) -> bool {
    Dir::open_ambient_dir(path, ambient_authority()).is_ok()
}

/// Reads a UTF-8 file into memory.
///
/// # Errors
///
/// Returns [`FilesError::Io`] when the file cannot be read.
pub fn read_file(path: &Utf8Path) -> Result<String, FilesError> {
    let (parent, file_name) = split(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| FilesError::Io {
        path: parent.to_path_buf(),
        message: err.to_string(),
    })?;
    dir.read_to_string(file_name).map_err(|err| FilesError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
