//! Best-effort metadata restoration.
//!
//! Ownership, mode and timestamp changes commonly fail when running without
//! privileges, and a failure here never invalidates content that was already
//! written. These operations therefore return [`BestEffort`] instead of the
//! crate [`Result`](crate::Result): callers either inspect the [`Ignored`]
//! value or drop it through [`IgnoredExt::or_log`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub use filetime::FileTime;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaOp {
    Mode,
    Times,
    Owner,
}

impl fmt::Display for MetaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mode => "chmod",
            Self::Times => "chtimes",
            Self::Owner => "chown",
        })
    }
}

/// A metadata operation that failed and may be skipped.
#[derive(Debug, thiserror::Error)]
#[error("{op} '{path}' skipped: {source}")]
pub struct Ignored {
    pub op: MetaOp,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

pub type BestEffort = std::result::Result<(), Ignored>;

pub trait IgnoredExt {
    /// Drop the failure after recording it at debug level.
    fn or_log(self);
}

impl IgnoredExt for BestEffort {
    fn or_log(self) {
        if let Err(ignored) = self {
            debug!(op = %ignored.op, path = %ignored.path.display(), error = %ignored.source, "metadata not restored");
        }
    }
}

fn ignored(op: MetaOp, path: &Path) -> impl FnOnce(io::Error) -> Ignored + '_ {
    move |source| Ignored {
        op,
        path: path.to_path_buf(),
        source,
    }
}

/// Apply permission bits (including setuid/setgid/sticky) to `path`.
pub fn set_mode(path: &Path, mode: u32) -> BestEffort {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(mode & 0o7777);
        std::fs::set_permissions(path, perms).map_err(ignored(MetaOp::Mode, path))
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

pub fn set_times(path: &Path, atime: FileTime, mtime: FileTime) -> BestEffort {
    filetime::set_file_times(path, atime, mtime).map_err(ignored(MetaOp::Times, path))
}

/// Like [`set_times`] but acts on the link itself.
pub fn set_symlink_times(path: &Path, atime: FileTime, mtime: FileTime) -> BestEffort {
    filetime::set_symlink_file_times(path, atime, mtime).map_err(ignored(MetaOp::Times, path))
}

pub fn set_owner(path: &Path, uid: u64, gid: u64) -> BestEffort {
    #[cfg(unix)]
    {
        use nix::unistd::{Gid, Uid, chown};

        let (uid, gid) = raw_ids(uid, gid).map_err(ignored(MetaOp::Owner, path))?;
        chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .map_err(io::Error::from)
            .map_err(ignored(MetaOp::Owner, path))
    }

    #[cfg(not(unix))]
    {
        let _ = (path, uid, gid);
        Ok(())
    }
}

/// Like [`set_owner`] but acts on the link itself.
pub fn set_symlink_owner(path: &Path, uid: u64, gid: u64) -> BestEffort {
    #[cfg(unix)]
    {
        let (uid, gid) = raw_ids(uid, gid).map_err(ignored(MetaOp::Owner, path))?;
        std::os::unix::fs::lchown(path, Some(uid), Some(gid)).map_err(ignored(MetaOp::Owner, path))
    }

    #[cfg(not(unix))]
    {
        let _ = (path, uid, gid);
        Ok(())
    }
}

#[cfg(unix)]
fn raw_ids(uid: u64, gid: u64) -> io::Result<(u32, u32)> {
    let out_of_range = |_| io::Error::new(io::ErrorKind::InvalidInput, "id out of range");
    Ok((
        u32::try_from(uid).map_err(out_of_range)?,
        u32::try_from(gid).map_err(out_of_range)?,
    ))
}
