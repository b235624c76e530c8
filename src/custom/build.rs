//! Download and build helpers shared by custom install functions.

use shell_escape::unix::escape;
use tracing::info;

use crate::context::InstallContext;
use crate::remote::{ExecMode, RemoteError};

const ARCHIVE_SUFFIXES: [&str; 6] = [".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".zip"];

/// Returns the file name at the end of `url`.
#[must_use]
pub fn archive_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Returns the directory an archive is expected to unpack into.
///
/// # Examples
///
/// ```
/// # use biolinux::custom::build::unpacked_dir;
/// assert_eq!(unpacked_dir("samtools-1.9.tar.bz2"), "samtools-1.9");
/// ```
#[must_use]
pub fn unpacked_dir(archive: &str) -> &str {
    ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| archive.strip_suffix(suffix))
        .unwrap_or(archive)
}

/// Reports whether `binary` is already on the target's `PATH`.
///
/// # Errors
///
/// Returns [`RemoteError`] when the transport fails.
pub fn is_installed(context: &InstallContext<'_>, binary: &str) -> Result<bool, RemoteError> {
    context.remote.succeeds(
        &format!("command -v {} >/dev/null", escape(binary.into())),
        ExecMode::User,
    )
}

/// Downloads `url` into `work_dir` and unpacks it, returning the path of
/// the unpacked source directory.
///
/// # Errors
///
/// Returns [`RemoteError`] when the download or extraction fails.
pub fn fetch_and_unpack(
    context: &InstallContext<'_>,
    work_dir: &str,
    url: &str,
) -> Result<String, RemoteError> {
    let archive = archive_name(url);
    info!(%url, "fetching source archive");
    context.run(&format!(
        "cd {work_dir} && wget --no-check-certificate -O {archive} {url}"
    ))?;
    let extract = if archive.ends_with(".zip") {
        format!("cd {work_dir} && unzip -o {archive}")
    } else {
        format!("cd {work_dir} && tar -xf {archive}")
    };
    context.run(&extract)?;
    Ok(format!("{work_dir}/{}", unpacked_dir(archive)))
}

/// Runs `make` in `source_dir` and copies `binaries` into the system
/// `bin` directory.
///
/// # Errors
///
/// Returns [`RemoteError`] when the build or copy fails.
pub fn make_and_copy(
    context: &InstallContext<'_>,
    source_dir: &str,
    binaries: &[&str],
) -> Result<(), RemoteError> {
    context.run(&format!("cd {source_dir} && make"))?;
    copy_binaries(context, source_dir, binaries)
}

/// Copies prebuilt `binaries` from `source_dir` into the system `bin`
/// directory.
///
/// # Errors
///
/// Returns [`RemoteError`] when a copy fails.
pub fn copy_binaries(
    context: &InstallContext<'_>,
    source_dir: &str,
    binaries: &[&str],
) -> Result<(), RemoteError> {
    let bin_dir = format!("{}/bin", context.env.system_install);
    for binary in binaries {
        context.safe_sudo(&format!("install -m 0755 {source_dir}/{binary} {bin_dir}/"))?;
    }
    Ok(())
}
