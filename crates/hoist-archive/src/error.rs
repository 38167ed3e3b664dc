use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to resolve path '{path}': {source}")]
    Resolve { path: PathBuf, source: io::Error },

    #[error("failed to open archive '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("archive is corrupted: {source}")]
    Corrupted { source: io::Error },

    #[error("archive entry has an invalid header: {source}")]
    InvalidEntry { source: io::Error },

    #[error("failed to read content for '{path}': {source}")]
    ContentRead { path: PathBuf, source: io::Error },

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory: {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("failed to create symlink '{link}' -> '{target}': {source}")]
    SymlinkCreationFailed {
        target: PathBuf,
        link: PathBuf,
        source: io::Error,
    },

    #[error("failed to pack '{path}': {source}")]
    PackFailed { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Prepare(#[from] hoist_fs::Error),

    #[error("{cause} (rollback failed: {source})")]
    RollbackFailed {
        cause: Box<Error>,
        source: hoist_fs::Error,
    },
}

impl Error {
    /// Whether the output directory may have been left in a partial state.
    pub fn is_rollback_failure(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
