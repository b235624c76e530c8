//! Launch parameters for a CloudMan cluster.
//!
//! CloudMan images are launched with a YAML user-data document carrying
//! cloud credentials and cluster settings. When the image is given as
//! `__use_snaps__`, the machine image is taken from the `snaps.yaml`
//! published alongside the CloudMan bucket contents. The CloudMan sources
//! themselves are published to the same bucket as `cm.tar.gz`.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::info;

use crate::files::{self, FilesError};
use crate::remote::RemoteError;

mod bundle;

pub use bundle::BUNDLE_FILE;

/// Image id placeholder requesting resolution through `snaps.yaml`.
pub const USE_SNAPS: &str = "__use_snaps__";

/// Snapshot manifest file name inside `bucket_source`.
pub const SNAPS_FILE: &str = "snaps.yaml";

/// Cluster name used when none is configured.
pub const DEFAULT_CLUSTER_NAME: &str = "cloudman";

/// Administrator password used when none is configured.
pub const DEFAULT_PASSWORD: &str = "adminpass";

/// Errors raised while preparing a CloudMan launch.
#[derive(Debug, Error)]
pub enum CloudmanError {
    /// Raised when an options or snapshot file cannot be read or parsed.
    #[error(transparent)]
    Files(#[from] FilesError),
    /// Raised when `__use_snaps__` is requested without a bucket source.
    #[error("image_id is {USE_SNAPS} but no bucket_source is configured")]
    MissingBucketSource,
    /// Raised when `snaps.yaml` does not exist.
    #[error("image_id is {USE_SNAPS} but no {SNAPS_FILE} was found at {path}")]
    MissingSnaps {
        /// Expected location of the manifest.
        path: Utf8PathBuf,
    },
    /// Raised when the manifest does not describe exactly one entry at a
    /// level.
    #[error("exactly one {level} must be defined in {SNAPS_FILE}, found {found}")]
    Ambiguous {
        /// Manifest level (`cloud`, `region` or `deployment`).
        level: &'static str,
        /// Number of entries present.
        found: usize,
    },
    /// Raised when the user data cannot be rendered.
    #[error("failed to render user data: {0}")]
    Render(String),
    /// Raised when a bundle is requested without `cloudman_repository`.
    #[error("no cloudman_repository is configured")]
    MissingRepository,
    /// Raised when a local bundling command cannot be started.
    #[error(transparent)]
    Local(#[from] RemoteError),
    /// Raised when a local bundling command exits unsuccessfully.
    #[error("`{command}` failed with status {status_text}: {stderr}")]
    BundleCommand {
        /// Command that failed.
        command: String,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when a local working directory is not valid UTF-8.
    #[error("working directory is not valid UTF-8: {0}")]
    WorkDir(String),
}

/// CloudMan launch options.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CloudmanOptions {
    /// Machine image id, or `__use_snaps__`.
    #[serde(default)]
    pub image_id: Option<String>,
    /// Instance size id.
    #[serde(default)]
    pub size_id: Option<String>,
    /// Local directory holding the CloudMan bucket contents.
    #[serde(default)]
    pub bucket_source: Option<Utf8PathBuf>,
    /// Cluster name.
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    /// Administrator password.
    #[serde(default = "default_password")]
    pub password: String,
    /// User data entries passed through to CloudMan.
    #[serde(default)]
    pub user_data: Mapping,
    /// Whether CloudMan should skip its own start-up.
    #[serde(default)]
    pub skip_cloudman: bool,
    /// Cloud access key; read from the environment when absent.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Cloud secret key; read from the environment when absent.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Local directory, or git/hg URL, holding the CloudMan sources.
    #[serde(default)]
    pub cloudman_repository: Option<String>,
    /// Branch checked out when cloning a git repository.
    #[serde(default)]
    pub repository_branch: Option<String>,
}

impl Default for CloudmanOptions {
    fn default() -> Self {
        Self {
            image_id: None,
            size_id: None,
            bucket_source: None,
            cluster_name: default_cluster_name(),
            password: default_password(),
            user_data: Mapping::new(),
            skip_cloudman: false,
            access_key: None,
            secret_key: None,
            cloudman_repository: None,
            repository_branch: None,
        }
    }
}

fn default_cluster_name() -> String {
    String::from(DEFAULT_CLUSTER_NAME)
}

fn default_password() -> String {
    String::from(DEFAULT_PASSWORD)
}

/// Resolved launch parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LaunchSpec {
    /// Machine image to boot.
    pub image_id: Option<String>,
    /// Instance size.
    pub size_id: Option<String>,
    /// Rendered YAML user data.
    pub user_data: String,
}

#[derive(Debug, Default, Deserialize)]
struct SnapsManifest {
    #[serde(default)]
    clouds: Vec<SnapsCloud>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapsCloud {
    #[serde(default)]
    regions: Vec<SnapsRegion>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapsRegion {
    #[serde(default)]
    deployments: Vec<SnapsDeployment>,
}

#[derive(Debug, Deserialize)]
struct SnapsDeployment {
    default_mi: String,
}

fn only<T>(items: Vec<T>, level: &'static str) -> Result<T, CloudmanError> {
    let found = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), iter.next()) {
        (Some(item), None) => Ok(item),
        _ => Err(CloudmanError::Ambiguous { level, found }),
    }
}

impl CloudmanOptions {
    /// Reads options from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CloudmanError::Files`] when the file is unreadable or
    /// malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, CloudmanError> {
        let options: Option<Self> = files::read_yaml_path(path)?;
        Ok(options.unwrap_or_default())
    }

    /// Returns the image to launch, consulting `snaps.yaml` for
    /// `__use_snaps__`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudmanError`] when the manifest is missing, malformed or
    /// does not hold exactly one cloud, region and deployment.
    pub fn resolve_image(&self) -> Result<Option<String>, CloudmanError> {
        let Some(image_id) = &self.image_id else {
            return Ok(None);
        };
        if !image_id.eq_ignore_ascii_case(USE_SNAPS) {
            return Ok(Some(image_id.clone()));
        }

        let bucket = self
            .bucket_source
            .as_ref()
            .ok_or(CloudmanError::MissingBucketSource)?;
        let path = bucket.join(SNAPS_FILE);
        if !files::path_exists(&path)? {
            return Err(CloudmanError::MissingSnaps { path });
        }
        let manifest: Option<SnapsManifest> = files::read_yaml_path(&path)?;
        let cloud = only(manifest.unwrap_or_default().clouds, "cloud")?;
        let region = only(cloud.regions, "region")?;
        let deployment = only(region.deployments, "deployment")?;
        info!(image = %deployment.default_mi, %path, "resolved image from snapshots");
        Ok(Some(deployment.default_mi))
    }

    /// Renders the user data, filling credentials, cluster name and
    /// password when `user_data` does not already set them.
    ///
    /// # Errors
    ///
    /// Returns [`CloudmanError::Render`] when serialization fails.
    pub fn user_data(&self, access_key: &str, secret_key: &str) -> Result<String, CloudmanError> {
        let mut data = self.user_data.clone();
        for (name, value) in [
            ("access_key", access_key),
            ("secret_key", secret_key),
            ("cluster_name", self.cluster_name.as_str()),
            ("password", self.password.as_str()),
        ] {
            let key = Value::from(name);
            if !data.contains_key(&key) {
                data.insert(key, Value::from(value));
            }
        }
        if self.skip_cloudman {
            data.insert(Value::from("skip_cloudman"), Value::Bool(true));
        }
        serde_yaml::to_string(&data).map_err(|err| CloudmanError::Render(err.to_string()))
    }

    /// Resolves the image and renders the user data.
    ///
    /// # Errors
    ///
    /// Returns [`CloudmanError`] when either step fails.
    pub fn launch_spec(
        &self,
        access_key: &str,
        secret_key: &str,
    ) -> Result<LaunchSpec, CloudmanError> {
        Ok(LaunchSpec {
            image_id: self.resolve_image()?,
            size_id: self.size_id.clone(),
            user_data: self.user_data(access_key, secret_key)?,
        })
    }
}
