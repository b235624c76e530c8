//! Next-generation sequencing aligners and utilities built from source.

use tracing::info;

use super::CustomRegistry;
use super::build::{copy_binaries, fetch_and_unpack, is_installed, make_and_copy};
use crate::context::InstallContext;
use crate::error::InstallError;

/// Module name the functions are registered under.
pub const MODULE: &str = "bio_nextgen";

const SAMTOOLS_URL: &str =
    "https://github.com/samtools/samtools/releases/download/1.9/samtools-1.9.tar.bz2";
const BWA_URL: &str = "https://github.com/lh3/bwa/releases/download/v0.7.17/bwa-0.7.17.tar.bz2";
const BOWTIE2_URL: &str = "https://github.com/BenLangmead/bowtie2/releases/download/v2.3.5.1/bowtie2-2.3.5.1-linux-x86_64.zip";

/// Registers every function of this module.
pub fn register(registry: &mut CustomRegistry) {
    registry.register(MODULE, "install_samtools", install_samtools);
    registry.register(MODULE, "install_bwa", install_bwa);
    registry.register(MODULE, "install_bowtie2", install_bowtie2);
}

fn skip_if_present(context: &InstallContext<'_>, binary: &str) -> Result<bool, InstallError> {
    let present = is_installed(context, binary)?;
    if present {
        info!(%binary, "already installed; skipping");
    }
    Ok(present)
}

/// Builds samtools from source.
///
/// # Errors
///
/// Returns [`InstallError::Remote`] when a build step fails.
pub fn install_samtools(context: &InstallContext<'_>) -> Result<(), InstallError> {
    if skip_if_present(context, "samtools")? {
        return Ok(());
    }
    context.with_tmp_dir(|work_dir| {
        let source = fetch_and_unpack(context, work_dir, SAMTOOLS_URL)?;
        context.run(&format!(
            "cd {source} && ./configure --prefix={} --without-curses",
            context.env.system_install
        ))?;
        context.run(&format!("cd {source} && make"))?;
        context.safe_sudo(&format!("cd {source} && make install"))?;
        Ok(())
    })
}

/// Builds the bwa aligner from source.
///
/// # Errors
///
/// Returns [`InstallError::Remote`] when a build step fails.
pub fn install_bwa(context: &InstallContext<'_>) -> Result<(), InstallError> {
    if skip_if_present(context, "bwa")? {
        return Ok(());
    }
    context.with_tmp_dir(|work_dir| {
        let source = fetch_and_unpack(context, work_dir, BWA_URL)?;
        make_and_copy(context, &source, &["bwa"])?;
        Ok(())
    })
}

/// Installs the prebuilt Bowtie 2 binaries.
///
/// # Errors
///
/// Returns [`InstallError::Remote`] when a download or copy fails.
pub fn install_bowtie2(context: &InstallContext<'_>) -> Result<(), InstallError> {
    if skip_if_present(context, "bowtie2")? {
        return Ok(());
    }
    context.with_tmp_dir(|work_dir| {
        let source = fetch_and_unpack(context, work_dir, BOWTIE2_URL)?;
        copy_binaries(context, &source, &["bowtie2*"])?;
        Ok(())
    })
}
