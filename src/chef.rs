//! Chef-solo provisioning of configuration recipes.
//!
//! Recipes come from a local chef repository (`chef_dir`, default
//! `config/chef`) holding `cookbooks`, `data_bags` and `roles`. The
//! repository is uploaded to the target, a `node.json` is assembled from
//! `node_extra.json` plus the run environment, and `chef-solo` runs once for
//! the whole run list.

use camino::Utf8PathBuf;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::RunEnvironment;
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::files::{self, ConfigFiles};
use crate::timing::timed;

/// Remote working directory for chef-solo.
pub const REMOTE_CHEF_DIR: &str = "/tmp/chef-solo";

/// Logical name of the extra node attributes file.
pub const NODE_EXTRA: &str = "node_extra.json";

/// Command bootstrapping chef through the omnibus installer.
pub const OMNIBUS_INSTALL: &str = "curl -L https://www.opscode.com/chef/install.sh | bash";

const CHEF_PREFIX: &str = "chef_";
const ENV_PREFIX: &str = "cloudbiolinux_";
const REPOSITORY_DIRS: [&str; 3] = ["cookbooks", "data_bags", "roles"];

/// Merges string-valued run environment settings into `extra`.
///
/// Keys already present in `extra` are left alone. A `chef_` prefix is
/// stripped so `chef_apache_dir` becomes `apache_dir`; any other key is
/// exposed as `cloudbiolinux_<key>`, the attribute names existing
/// cookbooks read.
///
/// # Errors
///
/// Returns [`InstallError::ChefAttributes`] when `extra` is neither an
/// object nor `null`, and [`InstallError::Config`] when the run
/// environment cannot be serialized.
pub fn build_chef_properties(
    env: &RunEnvironment,
    extra: Value,
) -> Result<Map<String, Value>, InstallError> {
    let mut properties = match extra {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(InstallError::ChefAttributes(format!(
                "{NODE_EXTRA} must hold a JSON object, found {other}"
            )));
        }
    };

    for (key, value) in env.string_properties()? {
        if properties.contains_key(&key) {
            continue;
        }
        let name = key
            .strip_prefix(CHEF_PREFIX)
            .map_or_else(|| format!("{ENV_PREFIX}{key}"), str::to_owned);
        properties.insert(name, Value::String(value));
    }
    Ok(properties)
}

/// A configured chef-solo run.
#[derive(Clone, Debug, PartialEq)]
pub struct ChefSolo {
    /// Local chef repository root.
    pub chef_dir: Utf8PathBuf,
    /// Node attributes, without the run list.
    pub attributes: Map<String, Value>,
    /// Recipes to converge, in order.
    pub recipes: Vec<String>,
    /// Whether to bootstrap chef with the omnibus installer first.
    pub use_omnibus_installer: bool,
}

impl ChefSolo {
    /// Prepares a run from the environment and `node_extra.json`, which is
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when `node_extra.json` exists but is
    /// malformed.
    pub fn configure(
        env: &RunEnvironment,
        config_files: &ConfigFiles,
    ) -> Result<Self, InstallError> {
        let extra = if config_files.find(NODE_EXTRA)?.is_some() {
            config_files.read_jsonc(NODE_EXTRA)?
        } else {
            debug!("no {NODE_EXTRA}; using run environment attributes only");
            Value::Null
        };
        Ok(Self {
            chef_dir: Utf8PathBuf::from(&env.chef_dir),
            attributes: build_chef_properties(env, extra)?,
            recipes: Vec::new(),
            use_omnibus_installer: env.use_chef_omnibus_installer,
        })
    }

    /// Appends `recipe` to the run list.
    pub fn add_recipe(&mut self, recipe: impl Into<String>) {
        self.recipes.push(recipe.into());
    }

    /// Returns the `node.json` document: the attributes plus `run_list`.
    #[must_use]
    pub fn node_json(&self) -> Value {
        let mut node = self.attributes.clone();
        let run_list = self
            .recipes
            .iter()
            .map(|recipe| Value::String(format!("recipe[{recipe}]")))
            .collect();
        node.insert(String::from("run_list"), Value::Array(run_list));
        Value::Object(node)
    }

    /// Returns the `solo.rb` configuration pointing at the uploaded
    /// repository.
    #[must_use]
    pub fn solo_rb() -> String {
        format!(
            "file_cache_path \"{REMOTE_CHEF_DIR}\"\n\
             cookbook_path \"{REMOTE_CHEF_DIR}/cookbooks\"\n\
             data_bag_path \"{REMOTE_CHEF_DIR}/data_bags\"\n\
             role_path \"{REMOTE_CHEF_DIR}/roles\"\n"
        )
    }

    /// Uploads the repository, writes the configuration and runs
    /// `chef-solo` on the target.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when any upload or remote command fails.
    pub fn provision(&self, context: &InstallContext<'_>) -> Result<(), InstallError> {
        if self.use_omnibus_installer {
            info!("bootstrapping chef with the omnibus installer");
            context.sudo(OMNIBUS_INSTALL)?;
        }

        context.run(&format!("mkdir -p {REMOTE_CHEF_DIR}"))?;
        for name in REPOSITORY_DIRS {
            let local = self.chef_dir.join(name);
            if files::is_dir(&local) {
                let remote = format!("{REMOTE_CHEF_DIR}/{name}");
                context.run(&format!("mkdir -p {remote}"))?;
                context.remote.upload(&local, &remote)?;
            } else {
                debug!(%local, "chef directory absent; not uploading");
            }
        }

        let node = serde_json::to_string_pretty(&self.node_json())
            .map_err(|err| InstallError::ChefAttributes(err.to_string()))?;
        context.write_file(&format!("{REMOTE_CHEF_DIR}/solo.rb"), &Self::solo_rb())?;
        context.write_file(&format!("{REMOTE_CHEF_DIR}/node.json"), &node)?;
        context.sudo(&format!(
            "cd {REMOTE_CHEF_DIR} && chef-solo -c solo.rb -j node.json"
        ))?;
        Ok(())
    }
}

/// Converges `recipes` with a single chef-solo run.
///
/// # Errors
///
/// Returns [`InstallError`] when configuration or provisioning fails.
pub fn install_chef_recipes(
    context: &InstallContext<'_>,
    config_files: &ConfigFiles,
    recipes: &[String],
) -> Result<(), InstallError> {
    let label = format!("chef provision for recipe(s) '{}'", recipes.join(", "));
    timed(&label, || {
        let mut chef = ChefSolo::configure(context.env, config_files)?;
        for recipe in recipes {
            chef.add_recipe(recipe.as_str());
        }
        chef.provision(context)
    })
}

#[cfg(test)]
mod tests;
