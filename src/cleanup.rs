//! Disk space cleanup and EC2 image preparation.

use tracing::info;

use crate::context::InstallContext;
use crate::error::InstallError;
use crate::packages::PackageManager;
use crate::remote::ExecMode;

/// Pinned cloud-init package installed on Ubuntu images.
pub const CLOUD_INIT_DEB: &str = "cloud-init_0.7.1-0ubuntu4_all.deb";

const CLOUD_INIT_URL: &str = "https://launchpad.net/ubuntu/+archive/primary/+files";

/// Removes caches and scratch files left behind by the install. Failing
/// commands are logged and skipped.
///
/// # Errors
///
/// Returns [`InstallError`] for an unsupported distribution or a transport
/// failure.
pub fn cleanup_space(context: &InstallContext<'_>) -> Result<(), InstallError> {
    info!("cleaning up space");
    let manager = PackageManager::for_distribution(&context.env.distribution)?;
    let steps = [
        ("rm -rf .cpanm", ExecMode::User),
        ("rm -f /var/crash/*", ExecMode::Sudo),
        ("rm -f ~/*.dot", ExecMode::User),
        ("rm -f ~/*.log", ExecMode::User),
        (manager.clean_command(), ExecMode::Sudo),
    ];
    for (command, mode) in steps {
        context.best_effort(command, mode)?;
    }
    Ok(())
}

/// Prepares the target for snapshotting as an EC2 image: on Ubuntu installs
/// the pinned cloud-init package, then removes host keys, shell history and
/// the login user's authorized keys.
///
/// # Errors
///
/// Returns [`InstallError::Remote`] when a command fails.
pub fn prepare_ec2_image(context: &InstallContext<'_>) -> Result<(), InstallError> {
    if context.env.distribution.eq_ignore_ascii_case("ubuntu") {
        info!(package = CLOUD_INIT_DEB, "installing cloud-init");
        context.sudo(&format!(
            "wget --output-document={CLOUD_INIT_DEB} {CLOUD_INIT_URL}/{CLOUD_INIT_DEB}"
        ))?;
        context.sudo(&format!("dpkg -i {CLOUD_INIT_DEB}"))?;
        context.sudo(&format!("rm -f {CLOUD_INIT_DEB}"))?;
    }

    info!("removing credentials and history for EC2 image");
    let user = &context.env.ssh_user;
    context.sudo("rm -f /etc/ssh/ssh_host_*")?;
    context.sudo("rm -f /root/.bash_history /root/.ssh/authorized_keys")?;
    context.sudo(&format!("rm -f ~{user}/.bash_history"))?;
    context.sudo(&format!("rm -f ~{user}/.ssh/authorized_keys"))?;
    Ok(())
}
