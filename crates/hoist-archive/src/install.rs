use std::fs::File;
use std::path::{Component, Path, PathBuf};

use hoist_fs::prepare_dir;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::extract::{DIR_MODE, extract};
use crate::report::Report;

/// Archive to install and where to install it, both absolute and normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRequest {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl UpdateRequest {
    /// Resolve both paths and check that the archive can be opened.
    pub fn resolve(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Self> {
        let input = absolute(input.as_ref())?;
        let output = absolute(output.as_ref())?;

        File::open(&input).map_err(|source| Error::Open {
            path: input.clone(),
            source,
        })?;

        Ok(Self { input, output })
    }

    /// Prepare the output directory, extract into it, and roll back the
    /// directories created by preparation if extraction fails.
    pub fn run(&self) -> Result<Report> {
        let undo = prepare_dir(&self.output, DIR_MODE)?;

        match extract(&self.input, &self.output) {
            Ok(report) => {
                drop(undo);
                info!(
                    archive = %self.input.display(),
                    output = %self.output.display(),
                    files = report.files,
                    directories = report.directories,
                    skipped = report.skipped.len(),
                    "archive extracted"
                );
                Ok(report)
            }
            Err(cause) => {
                warn!(error = %cause, output = %self.output.display(), "extraction failed, rolling back");
                match undo.run() {
                    Ok(()) => Err(cause),
                    Err(source) => Err(Error::RollbackFailed {
                        cause: Box::new(cause),
                        source,
                    }),
                }
            }
        }
    }
}

/// Extract the tar.gz at `input` over `output`, creating `output` if needed.
///
/// When `output` did not exist beforehand, a failure leaves no trace of it. A
/// pre-existing `output` is left as the failed extraction found it.
pub fn extract_tar_gz(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Report> {
    UpdateRequest::resolve(input, output)?.run()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(path).map_err(|source| Error::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&path))
}

/// Lexically resolve `.` and `..`; trailing separators disappear with them.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other.as_os_str()),
        }
    }

    result
}
