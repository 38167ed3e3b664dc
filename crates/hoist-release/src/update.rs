use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hoist_archive::extract_tar_gz;
use hoist_version::is_newer;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::github::{GithubClient, Latest};

/// Where releases come from and what they contain.
#[derive(Clone, Debug)]
pub struct ReleaseSource {
    /// `owner/name` on GitHub.
    pub repo: String,
    /// Executable name inside the release archive.
    pub binary_name: String,
    /// Asset name prefix, with `{os}` and `{arch}` placeholders.
    pub asset_pattern: String,
    pub allow_prereleases: bool,
}

pub struct Updater {
    client: GithubClient,
    source: ReleaseSource,
}

impl Updater {
    pub fn new(client: GithubClient, source: ReleaseSource) -> Self {
        Self { client, source }
    }

    pub fn latest(&self) -> Result<Latest> {
        self.client.latest(
            &self.source.repo,
            &self.source.asset_pattern,
            self.source.allow_prereleases,
        )
    }

    /// The latest release, if it is newer than `current`.
    pub fn check(&self, current: &str) -> Result<Option<Latest>> {
        let latest = self.latest()?;
        if is_newer(&latest.version, current, self.source.allow_prereleases) {
            Ok(Some(latest))
        } else {
            Ok(None)
        }
    }

    /// Replace the running executable with the latest release.
    pub fn update(&self, current: &str) -> Result<String> {
        let exe = env::current_exe().map_err(Error::CurrentExe)?;
        self.update_at(current, &exe)
    }

    /// Replace the executable at `target` with the latest release and return
    /// the installed version.
    pub fn update_at(&self, current: &str, target: &Path) -> Result<String> {
        let latest = self.latest()?;
        if !is_newer(&latest.version, current, self.source.allow_prereleases) {
            return Err(Error::NoNewerRelease {
                current: current.to_string(),
                latest: latest.version,
            });
        }
        info!(current, latest = %latest.version, "updating");

        let staging = tempfile::Builder::new()
            .prefix("hoist-update-")
            .tempdir()
            .map_err(|source| Error::Io {
                path: env::temp_dir(),
                source,
            })?;

        let archive = self.client.download(&latest.url, staging.path())?;
        let unpacked = staging.path().join("unpacked");
        extract_tar_gz(&archive, &unpacked)?;

        let binary = find_binary(&unpacked, &self.source.binary_name)?;
        replace_executable(&binary, target)?;

        info!(path = %target.display(), version = %latest.version, "update installed");
        Ok(latest.version)
    }
}

/// First regular file named `name` (plus the platform executable suffix)
/// under `dir`.
pub fn find_binary(dir: &Path, name: &str) -> Result<PathBuf> {
    let wanted = format!("{name}{}", env::consts::EXE_SUFFIX);

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == wanted.as_str())
        .map(|entry| entry.into_path())
        .ok_or_else(|| Error::BinaryNotFound {
            name: name.to_string(),
        })
}

/// Swap `new_binary` into `target`.
///
/// The new file is staged beside the target first so the final step is a
/// rename on one filesystem. If that rename fails the previous executable is
/// put back.
pub fn replace_executable(new_binary: &Path, target: &Path) -> Result<()> {
    let staged = sibling(target, "new");
    let backup = sibling(target, "old");
    let replace = |path: &Path| {
        let path = path.to_path_buf();
        move |source| Error::Replace { path, source }
    };

    fs::copy(new_binary, &staged).map_err(replace(&staged))?;
    make_executable(&staged).map_err(replace(&staged))?;

    if let Err(source) = fs::rename(target, &backup) {
        let _ = fs::remove_file(&staged);
        return Err(replace(target)(source));
    }

    if let Err(source) = fs::rename(&staged, target) {
        if let Err(e) = fs::rename(&backup, target) {
            warn!(path = %target.display(), backup = %backup.display(), error = %e, "failed to restore previous executable");
        }
        return Err(replace(target)(source));
    }

    // Windows keeps the running image locked.
    if let Err(e) = fs::remove_file(&backup) {
        debug!(path = %backup.display(), error = %e, "previous executable left in place");
    }

    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
