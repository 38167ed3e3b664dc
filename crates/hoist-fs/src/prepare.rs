use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Cleanup handle returned by [`prepare_dir`].
///
/// Holds the shallowest directory that preparation had to create. Running it
/// removes that directory and everything below it; a handle for a path that
/// already existed does nothing. `run` consumes the handle, so it can be
/// invoked at most once. Dropping it without running keeps the tree.
#[derive(Debug)]
#[must_use = "drop the undo explicitly if the created directories should be kept"]
pub struct Undo {
    created: Option<PathBuf>,
}

impl Undo {
    pub fn noop() -> Self {
        Self { created: None }
    }

    pub fn is_noop(&self) -> bool {
        self.created.is_none()
    }

    /// Topmost directory this undo would remove.
    pub fn path(&self) -> Option<&Path> {
        self.created.as_deref()
    }

    pub fn run(self) -> Result<()> {
        let Some(path) = self.created else {
            return Ok(());
        };

        debug!(path = %path.display(), "rolling back prepared directory");
        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            // Already gone counts as rolled back.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Rollback { path, source }),
        }
    }
}

/// Ensure `path` and all its ancestors exist as directories.
///
/// Walks from `path` towards the root until it meets an existing directory.
/// Missing levels are created in a single recursive call with `mode`
/// (ignored on non-unix targets). Fails with [`Error::NotADirectory`] when a
/// level is occupied by anything that does not resolve to a directory,
/// dangling symlinks included.
pub fn prepare_dir(path: impl AsRef<Path>, mode: u32) -> Result<Undo> {
    let path = path.as_ref();
    let mut first_missing: Option<&Path> = None;

    for level in path.ancestors() {
        if level.as_os_str().is_empty() {
            break;
        }

        match fs::metadata(level) {
            Ok(meta) if meta.is_dir() => break,
            Ok(_) => {
                return Err(Error::NotADirectory {
                    path: level.to_path_buf(),
                });
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                // A link whose target is missing still occupies the name.
                if fs::symlink_metadata(level).is_ok() {
                    return Err(Error::NotADirectory {
                        path: level.to_path_buf(),
                    });
                }
                first_missing = Some(level);
            }
            Err(source) => {
                return Err(Error::Stat {
                    path: level.to_path_buf(),
                    source,
                });
            }
        }
    }

    let Some(first_missing) = first_missing else {
        return Ok(Undo::noop());
    };

    create_all(path, mode).map_err(|source| Error::Create {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        created = %first_missing.display(),
        "prepared directory chain"
    );

    Ok(Undo {
        created: Some(first_missing.to_path_buf()),
    })
}

/// Recursive directory creation with an explicit mode.
pub fn create_all(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn existing_directory_yields_noop() -> Result<()> {
        let dir = tempdir().unwrap();
        let undo = prepare_dir(dir.path(), 0o750)?;
        assert!(undo.is_noop());
        undo.run()?;
        assert!(dir.path().is_dir());
        Ok(())
    }

    #[test]
    fn records_shallowest_missing_level() -> Result<()> {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out/x/y");

        let undo = prepare_dir(&target, 0o750)?;
        assert!(target.is_dir());
        assert_eq!(undo.path(), Some(dir.path().join("out").as_path()));

        undo.run()?;
        assert!(!dir.path().join("out").exists());
        assert!(dir.path().exists());
        Ok(())
    }

    #[test]
    fn partially_existing_chain_removes_only_new_levels() -> Result<()> {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/keep.txt"), "keep").unwrap();

        let undo = prepare_dir(dir.path().join("out/x/y"), 0o750)?;
        assert_eq!(undo.path(), Some(dir.path().join("out/x").as_path()));

        undo.run()?;
        assert!(!dir.path().join("out/x").exists());
        assert!(dir.path().join("out/keep.txt").exists());
        Ok(())
    }

    #[test]
    fn file_in_the_way_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("occupied"), "x").unwrap();

        let err = prepare_dir(dir.path().join("occupied/inner"), 0o750).unwrap_err();
        assert!(matches!(err, Error::NotADirectory { .. }));
        assert_eq!(err.path(), dir.path().join("occupied"));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_rejected() {
        let dir = tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path().join("nowhere"), &link).unwrap();

        let err = prepare_dir(link.join("inner"), 0o750).unwrap_err();
        assert!(matches!(err, Error::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_directory_is_followed() -> Result<()> {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let undo = prepare_dir(link.join("inner"), 0o750)?;
        assert_eq!(undo.path(), Some(link.join("inner").as_path()));
        assert!(real.join("inner").is_dir());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn created_directories_use_requested_mode() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let target = dir.path().join("mode");
        let _undo = prepare_dir(&target, 0o700)?;

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        Ok(())
    }

    #[test]
    fn undo_tolerates_already_removed_tree() -> Result<()> {
        let dir = tempdir().unwrap();
        let undo = prepare_dir(dir.path().join("gone"), 0o750)?;
        std::fs::remove_dir(dir.path().join("gone")).unwrap();
        undo.run()
    }
}
