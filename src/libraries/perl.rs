//! CPAN modules installed with `cpanminus`.

use serde::Deserialize;
use shell_escape::unix::escape;
use tracing::info;

use super::{LibraryCategory, LibraryInstaller, parse_config, rewrite};
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::flavor::Flavor;
use crate::remote::{ExecMode, RemoteError};

/// Download location of the standalone `cpanm` script.
pub const CPANM_URL: &str = "https://raw.github.com/miyagawa/cpanminus/master/cpanm";

/// Contents of `perl-libs.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct PerlLibraries {
    /// CPAN module names.
    #[serde(default)]
    pub cpan: Vec<String>,
}

/// Installs `perl-libs`, bootstrapping `cpanm` when it is not yet present.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerlInstaller;

fn ensure_cpanm(context: &InstallContext<'_>) -> Result<(), RemoteError> {
    let bin_dir = format!("{}/bin", context.env.system_install);
    if context
        .remote
        .succeeds(&format!("test -x {bin_dir}/cpanm"), ExecMode::User)?
    {
        return Ok(());
    }

    info!(%bin_dir, "bootstrapping cpanm");
    context.with_tmp_dir(|dir| {
        context.run(&format!(
            "cd {dir} && wget --no-check-certificate -O cpanm {CPANM_URL}"
        ))?;
        context.run(&format!("chmod a+rwx {dir}/cpanm"))?;
        context.safe_sudo(&format!("mv {dir}/cpanm {bin_dir}"))?;
        Ok(())
    })
}

impl LibraryInstaller for PerlInstaller {
    fn install(
        &self,
        context: &InstallContext<'_>,
        config: &serde_yaml::Value,
        flavor: &dyn Flavor,
    ) -> Result<(), InstallError> {
        let libraries: PerlLibraries = parse_config("perl-libs.yaml", config)?;
        let modules = rewrite(flavor, LibraryCategory::Perl, libraries.cpan);

        ensure_cpanm(context)?;
        let sudo_flag = if context.env.use_sudo { " --sudo" } else { "" };
        for module in &modules {
            // cpanm can wait on stdin indefinitely over a non-interactive session
            context.run(&format!(
                "cpanm{sudo_flag} --skip-installed --notest {} < /dev/null",
                escape(module.into())
            ))?;
        }
        Ok(())
    }
}
