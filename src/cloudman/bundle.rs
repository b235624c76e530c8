//! Packing the CloudMan sources into the bucket.

use std::env;
use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use shell_escape::unix::escape;
use tracing::{info, warn};

use super::{CloudmanError, CloudmanOptions};
use crate::remote::CommandRunner;

/// Archive written into `bucket_source`.
pub const BUNDLE_FILE: &str = "cm.tar.gz";

/// A repository that must be cloned before packing.
#[derive(Debug, Eq, PartialEq)]
enum RemoteRepository {
    Git { url: String, branch: Option<String> },
    Mercurial { url: String },
}

impl RemoteRepository {
    fn parse(repository: &str, branch: Option<&str>) -> Option<Self> {
        if !repository.starts_with("http") {
            return None;
        }
        if repository.ends_with(".git") {
            return Some(Self::Git {
                url: repository.to_owned(),
                branch: branch
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned),
            });
        }
        Some(Self::Mercurial {
            url: repository.to_owned(),
        })
    }

    fn clone_command(&self, checkout: &Utf8Path) -> (&'static str, Vec<OsString>) {
        match self {
            Self::Git { url, branch } => {
                let mut args = vec![OsString::from("clone")];
                if let Some(name) = branch {
                    args.push(OsString::from("-b"));
                    args.push(OsString::from(name));
                }
                args.push(OsString::from(url));
                args.push(OsString::from(checkout.as_str()));
                ("git", args)
            }
            Self::Mercurial { url } => (
                "hg",
                vec![
                    OsString::from("clone"),
                    OsString::from(url),
                    OsString::from(checkout.as_str()),
                ],
            ),
        }
    }
}

fn run_checked<R: CommandRunner>(
    runner: &R,
    program: &str,
    args: &[OsString],
) -> Result<(), CloudmanError> {
    let output = runner.run(program, args)?;
    if output.is_success() {
        return Ok(());
    }
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    Err(CloudmanError::BundleCommand {
        command: format!("{program} {}", rendered.join(" ")),
        status_text: output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string()),
        stderr: output.stderr.trim().to_owned(),
    })
}

fn absolute(path: Utf8PathBuf) -> Result<Utf8PathBuf, CloudmanError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir().map_err(|err| CloudmanError::WorkDir(err.to_string()))?;
    let base = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|dir| CloudmanError::WorkDir(dir.display().to_string()))?;
    Ok(base.join(path))
}

fn checkout_dir() -> Result<Utf8PathBuf, CloudmanError> {
    let base = Utf8PathBuf::from_path_buf(env::temp_dir())
        .map_err(|dir| CloudmanError::WorkDir(dir.display().to_string()))?;
    Ok(base.join(format!(
        "biolinux-cloudman-{}",
        uuid::Uuid::new_v4().simple()
    )))
}

fn archive<R: CommandRunner>(
    runner: &R,
    repository: &Utf8Path,
    target: &Utf8Path,
) -> Result<(), CloudmanError> {
    let script = format!(
        "cd {} && tar czf {} *",
        escape(repository.as_str().into()),
        escape(target.as_str().into())
    );
    let packed = run_checked(runner, "sh", &[OsString::from("-c"), OsString::from(script)]);
    if packed.is_err() {
        let removed = run_checked(
            runner,
            "rm",
            &[OsString::from("-f"), OsString::from(target.as_str())],
        );
        if let Err(err) = removed {
            warn!(%target, "failed to remove partial bundle: {err}");
        }
    }
    packed
}

impl CloudmanOptions {
    /// Packs the top-level, non-hidden contents of `cloudman_repository`
    /// into `<bucket_source>/cm.tar.gz` and returns the archive path.
    ///
    /// An `http` repository is cloned first into a temporary checkout,
    /// with git when the URL ends in `.git` (honouring
    /// `repository_branch`) and with Mercurial otherwise. The checkout is
    /// removed afterwards, whether or not packing succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CloudmanError`] when the repository or bucket is not
    /// configured, or when cloning or packing fails.
    pub fn bundle<R: CommandRunner>(&self, runner: &R) -> Result<Utf8PathBuf, CloudmanError> {
        let repository = self
            .cloudman_repository
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(CloudmanError::MissingRepository)?;
        let bucket = self
            .bucket_source
            .clone()
            .ok_or(CloudmanError::MissingBucketSource)?;
        let target = absolute(bucket)?.join(BUNDLE_FILE);

        match RemoteRepository::parse(repository, self.repository_branch.as_deref()) {
            None => archive(runner, Utf8Path::new(repository), &target)?,
            Some(remote) => {
                let checkout = checkout_dir()?;
                let (program, args) = remote.clone_command(&checkout);
                info!(%repository, %checkout, "cloning CloudMan sources");
                let packed = run_checked(runner, program, &args)
                    .and_then(|()| archive(runner, &checkout, &target));
                let cleaned = run_checked(
                    runner,
                    "rm",
                    &[OsString::from("-rf"), OsString::from(checkout.as_str())],
                );
                packed?;
                cleaned?;
            }
        }
        info!(%target, "bundled CloudMan sources");
        Ok(target)
    }
}
