//! CRAN and Bioconductor packages installed through a generated R script.

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::info;

use super::{LibraryCategory, LibraryInstaller, parse_config, rewrite};
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::flavor::Flavor;

/// Remote file name of the generated script.
pub const SCRIPT_FILE: &str = "install_packages.R";

const INSTALLED_QUERY: &str =
    "Rscript -e 'cat(rownames(installed.packages()), sep=\"\\n\")'";

/// Contents of `r-libs.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct RLibraries {
    /// CRAN mirror URL.
    #[serde(default)]
    pub cranrepo: String,
    /// URL of the Bioconductor bootstrap script (`biocLite.R`).
    #[serde(default)]
    pub biocrepo: String,
    /// CRAN package names.
    #[serde(default)]
    pub cran: Vec<String>,
    /// Bioconductor package names.
    #[serde(default)]
    pub bioc: Vec<String>,
}

/// Installs `r-libs` with a single `Rscript` run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RInstaller;

impl LibraryInstaller for RInstaller {
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &serde_yaml::Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let mut libraries: RLibraries = parse_config("r-libs.yaml", config)?;
        libraries.cran = rewrite(flavor, LibraryCategory::R, libraries.cran);

        let installed: BTreeSet<String> = context
            .run(INSTALLED_QUERY)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        info!(
            installed = installed.len(),
            cran = libraries.cran.len(),
            bioc = libraries.bioc.len(),
            "generating R install script"
        );

        let script = render_script(&libraries, &installed);
        context.run(&format!("rm -f {SCRIPT_FILE}"))?;
        context.write_file(SCRIPT_FILE, &script)?;
        context.safe_sudo(&format!("Rscript {SCRIPT_FILE}"))?;
        context.run(&format!("rm -f {SCRIPT_FILE}"))?;
        Ok(())
    }
}

/// Renders the install script. Packages already in `installed` are updated
/// in place; the rest are installed.
#[must_use]
pub fn render_script(libraries: &RLibraries, installed: &BTreeSet<String>) -> String {
    let mut lines = vec![
        String::from("cran.repos <- getOption(\"repos\")"),
        format!("cran.repos[\"CRAN\"] <- {}", r_string(&libraries.cranrepo)),
        String::from("options(repos=cran.repos)"),
        format!("source({})", r_string(&libraries.biocrepo)),
    ];

    for package in &libraries.cran {
        let name = r_string(package);
        lines.push(if installed.contains(package) {
            format!("update.packages(oldPkgs=c({name}), repos=cran.repos, ask=FALSE)")
        } else {
            format!("install.packages({name})")
        });
    }
    for package in &libraries.bioc {
        let name = r_string(package);
        lines.push(if installed.contains(package) {
            format!("update.packages(oldPkgs=c({name}), repos=biocinstallRepos(), ask=FALSE)")
        } else {
            format!("biocLite({name})")
        });
    }

    lines.push(String::from(
        "update.packages(repos=biocinstallRepos(), ask=FALSE)",
    ));
    lines.push(String::from("update.packages(ask=FALSE)"));
    let mut script = lines.join("\n");
    script.push('\n');
    script
}

fn r_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}
