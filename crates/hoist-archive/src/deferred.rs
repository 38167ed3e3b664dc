use std::path::{Path, PathBuf};

use hoist_fs::{IgnoredExt, metadata};
use tracing::debug;

use crate::entry::ArchiveEntry;

/// Directory metadata waiting for the end of the entry stream.
///
/// Writing a file into a directory bumps the directory's mtime, and a
/// read-only mode would block later writes, so both are applied only after
/// every entry has been extracted, in the order the directories appeared.
#[derive(Debug, Default)]
pub struct DeferredDirs {
    queue: Vec<(PathBuf, ArchiveEntry)>,
}

impl DeferredDirs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf, entry: ArchiveEntry) {
        self.queue.push((path, entry));
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.queue.iter().map(|(path, _)| path.as_path())
    }

    pub fn apply(self) {
        if self.queue.is_empty() {
            return;
        }
        debug!(count = self.queue.len(), "restoring directory metadata");
        for (path, entry) in self.queue {
            metadata::set_times(&path, entry.atime, entry.mtime).or_log();
            if let Some(mode) = entry.mode {
                metadata::set_mode(&path, mode).or_log();
            }
        }
    }
}
