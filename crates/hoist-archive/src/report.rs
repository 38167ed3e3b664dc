use std::path::PathBuf;

/// Summary of a completed extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub directories: usize,
    pub files: usize,
    pub links: usize,
    pub bytes_written: u64,
    /// Declared names of entries that were not materialized.
    pub skipped: Vec<PathBuf>,
}

impl Report {
    pub fn entry_count(&self) -> usize {
        self.directories + self.files + self.links + self.skipped.len()
    }

    pub(crate) fn skip(&mut self, name: PathBuf) {
        self.skipped.push(name);
    }
}
