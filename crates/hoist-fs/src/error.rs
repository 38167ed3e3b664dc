use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("'{path}' exists and is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("failed to inspect '{path}': {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to create directory '{path}': {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("failed to roll back '{path}': {source}")]
    Rollback { path: PathBuf, source: io::Error },
}

impl Error {
    /// Path the failed operation was acting on.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotADirectory { path }
            | Self::Stat { path, .. }
            | Self::Create { path, .. }
            | Self::Rollback { path, .. } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
