//! Run environment loading via `ortho-config`.
//!
//! The run environment is the ambient context of a provisioning run: which
//! host to reach and how, where configuration files live, which flavor to
//! apply and a handful of per-ecosystem knobs. It is loaded once and then
//! threaded explicitly through the orchestrator and the installers.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::SshTarget;

/// Settings for a provisioning run, merged from defaults, `biolinux.toml`,
/// `BIOLINUX_*` environment variables and CLI overrides.
#[derive(Clone, Debug, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "BIOLINUX",
    discovery(
        app_name = "biolinux",
        env_var = "BIOLINUX_CONFIG_PATH",
        config_file_name = "biolinux.toml",
        dotfile_name = ".biolinux.toml",
        project_file_name = "biolinux.toml"
    )
)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "configuration struct with user-facing toggle settings that are naturally expressed as booleans"
)]
pub struct RunEnvironment {
    /// Target host to provision.
    #[ortho_config(default = String::new())]
    pub host: String,
    /// Remote login user.
    #[ortho_config(default = "ubuntu".to_owned())]
    pub ssh_user: String,
    /// SSH port on the target.
    #[ortho_config(default = 22)]
    pub ssh_port: u16,
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Path to the `rsync` executable.
    #[ortho_config(default = "rsync".to_owned())]
    pub rsync_bin: String,
    /// Private key used for authentication. Supports `~/` expansion.
    pub ssh_identity_file: Option<String>,
    /// Whether to force batch mode for SSH to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to enforce host key checking.
    #[ortho_config(default = false)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub ssh_known_hosts_file: String,
    /// Directory holding `main.yaml` and the other package lists.
    #[ortho_config(default = "config".to_owned())]
    pub config_dir: String,
    /// Flavor name or directory applied on top of `config_dir`.
    pub flavor: Option<String>,
    /// Distribution of the target (`ubuntu`, `debian`, `centos`, ...).
    #[ortho_config(default = "ubuntu".to_owned())]
    pub distribution: String,
    /// Whether privileged steps go through `sudo`.
    #[ortho_config(default = true)]
    pub use_sudo: bool,
    /// Whether packages are additionally installed through nix.
    #[ortho_config(default = false)]
    pub nixpkgs: bool,
    /// Prefix for system-wide installs.
    #[ortho_config(default = "/usr".to_owned())]
    pub system_install: String,
    /// Per-user scratch directory for custom builds.
    #[ortho_config(default = "~/install".to_owned())]
    pub local_install: String,
    /// Suffix for versioned Python tools (`easy_install-2.7`).
    pub python_version_ext: Option<String>,
    /// Suffix for versioned Ruby tools (`gem1.9`).
    pub ruby_version_ext: Option<String>,
    /// Command used to install Python packages.
    #[ortho_config(default = "pip".to_owned())]
    pub pip_cmd: String,
    /// Whether the target is being prepared as an EC2 image.
    #[ortho_config(default = false)]
    pub is_ec2_image: bool,
    /// Local directory holding chef cookbooks, data bags and roles.
    #[ortho_config(default = "config/chef".to_owned())]
    pub chef_dir: String,
    /// Whether to bootstrap chef with the Opscode omnibus installer.
    #[ortho_config(default = false)]
    pub use_chef_omnibus_installer: bool,
    /// Remote file receiving one line per completed package phase.
    #[ortho_config(default = "/var/log/biolinux.log".to_owned())]
    pub install_log: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl RunEnvironment {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to biolinux.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads the environment without parsing CLI arguments. Values merge
    /// defaults, configuration files and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("biolinux")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages name
    /// the environment variable and configuration key to set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.host,
            &FieldMetadata::new("target host (or pass -H)", "BIOLINUX_HOST", "host"),
        )?;
        Self::require_field(
            &self.ssh_user,
            &FieldMetadata::new("SSH user", "BIOLINUX_SSH_USER", "ssh_user"),
        )?;
        Self::require_field(
            &self.config_dir,
            &FieldMetadata::new(
                "configuration directory",
                "BIOLINUX_CONFIG_DIR",
                "config_dir",
            ),
        )?;
        Self::require_field(
            &self.distribution,
            &FieldMetadata::new(
                "target distribution",
                "BIOLINUX_DISTRIBUTION",
                "distribution",
            ),
        )?;
        Self::require_field(
            &self.system_install,
            &FieldMetadata::new(
                "system install prefix",
                "BIOLINUX_SYSTEM_INSTALL",
                "system_install",
            ),
        )?;
        Ok(())
    }

    /// Builds the SSH connection settings for this run.
    #[must_use]
    pub fn ssh_target(&self) -> SshTarget {
        SshTarget {
            ssh_bin: self.ssh_bin.clone(),
            rsync_bin: self.rsync_bin.clone(),
            user: self.ssh_user.clone(),
            host: self.host.clone(),
            port: self.ssh_port,
            identity_file: self.ssh_identity_file.clone(),
            batch_mode: self.ssh_batch_mode,
            strict_host_key_checking: self.ssh_strict_host_key_checking,
            known_hosts_file: self.ssh_known_hosts_file.clone(),
        }
    }

    /// Returns the base configuration directory.
    #[must_use]
    pub fn config_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.config_dir)
    }

    /// Returns the suffix for versioned Python tools, including the leading
    /// dash, or an empty string.
    #[must_use]
    pub fn python_suffix(&self) -> String {
        version_suffix(self.python_version_ext.as_deref(), "-")
    }

    /// Returns the suffix for versioned Ruby tools, or an empty string.
    #[must_use]
    pub fn ruby_suffix(&self) -> String {
        version_suffix(self.ruby_version_ext.as_deref(), "")
    }

    /// Returns every string-valued setting keyed by field name. Used to
    /// expose the run environment to chef recipes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the settings cannot be
    /// serialized.
    pub fn string_properties(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let value = serde_json::to_value(self).map_err(|err| {
            ConfigError::Parse(format!("failed to serialize run environment: {err}"))
        })?;
        let serde_json::Value::Object(fields) = value else {
            return Ok(BTreeMap::new());
        };
        Ok(fields
            .into_iter()
            .filter_map(|(key, field)| match field {
                serde_json::Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect())
    }
}

fn version_suffix(ext: Option<&str>, separator: &str) -> String {
    match ext.map(str::trim) {
        Some(value) if !value.is_empty() => format!("{separator}{value}"),
        _ => String::new(),
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when a configured value is outside the supported set.
    #[error("unsupported {field}: {value}")]
    Unsupported {
        /// Field holding the value.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests;
