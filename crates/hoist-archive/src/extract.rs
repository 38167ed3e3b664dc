//! Streaming tar.gz extraction.
//!
//! # Platform Behavior
//!
//! **Unix**: mode bits, ownership and timestamps from the archive are restored
//! best-effort. Ownership usually only sticks when running as root.
//!
//! **Windows (non-Unix)**: mode and ownership restoration are no-ops; only
//! timestamps are applied.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::bufread::GzDecoder;
use hoist_fs::{IgnoredExt, create_all, metadata};
use tracing::{debug, warn};

use crate::deferred::DeferredDirs;
use crate::entry::{ArchiveEntry, EntryKind, invalid};
use crate::error::{Error, Result};
use crate::report::Report;
use crate::sanitize::{self, SkipReason, Verdict};

/// Size of each read from an entry's content stream.
pub const CHUNK_SIZE: usize = 4096;

/// Mode for directories created during extraction, before deferred
/// restoration applies the archived one.
pub const DIR_MODE: u32 = 0o750;

/// Extract the gzip-compressed tar at `archive` into the existing directory `out`.
pub fn extract(archive: &Path, out: &Path) -> Result<Report> {
    let file = File::open(archive).map_err(|source| Error::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    extract_from_reader(file, out)
}

/// Extract a gzip-compressed tar stream into the existing directory `out`.
///
/// Entries are processed strictly in stream order. Directory times and modes
/// are applied after the last entry.
pub fn extract_from_reader<R: Read>(reader: R, out: &Path) -> Result<Report> {
    let decoder = GzDecoder::new(BufReader::new(reader));
    let mut archive = tar::Archive::new(decoder);

    let mut report = Report::default();
    let mut deferred = DeferredDirs::new();

    for entry in archive.entries().map_err(corrupted)? {
        let mut entry = entry.map_err(corrupted)?;
        let name = entry.path().map_err(invalid)?.into_owned();

        let relative = match sanitize::screen(&name) {
            Verdict::Proceed(relative) => relative,
            Verdict::Skip(reason) => {
                warn!(entry = %name.display(), ?reason, "skipping archive entry");
                report.skip(name);
                continue;
            }
        };
        let meta = ArchiveEntry::from_tar(&mut entry)?;

        // A directory entry must not reuse a link left by an earlier entry either.
        let check_last = meta.kind == EntryKind::Directory;
        if routed_through_symlink(out, &relative, check_last) {
            warn!(entry = %name.display(), reason = ?SkipReason::ThroughSymlink, "skipping archive entry");
            report.skip(name);
            continue;
        }
        let dest = out.join(&relative);

        match meta.kind {
            EntryKind::Directory => {
                create_all(&dest, DIR_MODE).map_err(|source| Error::DirectoryCreationFailed {
                    path: dest.clone(),
                    source,
                })?;
                if let Some((uid, gid)) = meta.owner() {
                    metadata::set_owner(&dest, uid, gid).or_log();
                }
                debug!(path = %dest.display(), "created directory");
                deferred.push(dest, meta);
                report.directories += 1;
            }
            EntryKind::File => {
                let written = write_file(&mut entry, &dest)?;
                restore_file(&dest, &meta);
                debug!(path = %dest.display(), bytes = written, "extracted file");
                report.files += 1;
                report.bytes_written += written;
            }
            EntryKind::Symlink => {
                let target = meta.link_target.as_deref().unwrap_or(Path::new(""));
                let target = match sanitize::screen_link(&relative, target) {
                    Verdict::Proceed(target) => target,
                    Verdict::Skip(reason) => {
                        warn!(entry = %meta.name.display(), target = %target.display(), ?reason, "skipping symlink");
                        report.skip(meta.name);
                        continue;
                    }
                };
                write_symlink(&target, &dest)?;
                metadata::set_symlink_times(&dest, meta.atime, meta.mtime).or_log();
                if let Some((uid, gid)) = meta.owner() {
                    metadata::set_symlink_owner(&dest, uid, gid).or_log();
                }
                debug!(path = %dest.display(), target = %target.display(), "created symlink");
                report.links += 1;
            }
            EntryKind::HardLink => {
                let target = meta.link_target.as_deref().unwrap_or(Path::new(""));
                let source = match sanitize::screen(target) {
                    Verdict::Proceed(source) if routed_through_symlink(out, &source, true) => {
                        let reason = SkipReason::ThroughSymlink;
                        warn!(entry = %meta.name.display(), target = %target.display(), ?reason, "skipping hard link");
                        report.skip(meta.name);
                        continue;
                    }
                    Verdict::Proceed(source) => out.join(source),
                    Verdict::Skip(reason) => {
                        warn!(entry = %meta.name.display(), target = %target.display(), ?reason, "skipping hard link");
                        report.skip(meta.name);
                        continue;
                    }
                };
                write_hard_link(&source, &dest)?;
                debug!(path = %dest.display(), source = %source.display(), "created hard link");
                report.links += 1;
            }
            EntryKind::Other(typeflag) => {
                debug!(entry = %meta.name.display(), typeflag, "ignoring special entry");
                report.skip(meta.name);
            }
        }
    }

    deferred.apply();
    Ok(report)
}

fn corrupted(source: io::Error) -> Error {
    Error::Corrupted { source }
}

/// Whether an existing component of `relative` below `out` is a symlink.
///
/// The final component is only inspected when `check_last` is set; files and
/// links replace whatever sits at their own path. The walk stops at the first
/// missing component.
fn routed_through_symlink(out: &Path, relative: &Path, check_last: bool) -> bool {
    let mut components: Vec<_> = relative.components().collect();
    if !check_last {
        components.pop();
    }

    let mut path = out.to_path_buf();
    for component in components {
        path.push(component);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_symlink() => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.is_dir() {
            create_all(parent, DIR_MODE).map_err(|source| Error::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Remove a file or link already occupying `path`, so that creating the new
/// entry never writes through a link planted by an earlier one.
fn clear_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path).map_err(|source| Error::ExtractionFailed {
            path: path.to_path_buf(),
            source,
        }),
        _ => Ok(()),
    }
}

fn write_file(content: &mut impl Read, dest: &Path) -> Result<u64> {
    let failed = |source| Error::ExtractionFailed {
        path: dest.to_path_buf(),
        source,
    };

    ensure_parent(dest)?;
    clear_path(dest)?;

    let file = File::create(dest).map_err(failed)?;
    let mut writer = BufWriter::new(file);
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = match content.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::ContentRead {
                    path: dest.to_path_buf(),
                    source,
                });
            }
        };
        writer.write_all(&buffer[..n]).map_err(failed)?;
        written += n as u64;
    }

    writer.flush().map_err(failed)?;
    let file = writer.into_inner().map_err(|e| failed(e.into_error()))?;
    drop(file);

    Ok(written)
}

fn restore_file(path: &Path, meta: &ArchiveEntry) {
    if let Some(mode) = meta.mode {
        metadata::set_mode(path, mode).or_log();
    }
    metadata::set_times(path, meta.atime, meta.mtime).or_log();
    if let Some((uid, gid)) = meta.owner() {
        metadata::set_owner(path, uid, gid).or_log();
    }
}

fn write_symlink(target: &Path, link: &Path) -> Result<()> {
    ensure_parent(link)?;
    clear_path(link)?;

    let failed = |source| Error::SymlinkCreationFailed {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source,
    };

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(failed)
    }

    #[cfg(windows)]
    {
        let resolved = link.parent().map(|p| p.join(target)).unwrap_or_default();
        if resolved.is_dir() {
            std::os::windows::fs::symlink_dir(target, link).map_err(failed)
        } else {
            std::os::windows::fs::symlink_file(target, link).map_err(failed)
        }
    }
}

fn write_hard_link(source: &Path, link: &Path) -> Result<()> {
    ensure_parent(link)?;
    clear_path(link)?;

    fs::hard_link(source, link).map_err(|e| Error::ExtractionFailed {
        path: link.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn non_gzip_input_is_corrupted() {
        let dir = tempdir().unwrap();
        let data = Cursor::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let result = extract_from_reader(data, dir.path());
        assert!(matches!(result, Err(Error::Corrupted { .. })));
    }

    #[test]
    fn missing_archive_fails_to_open() {
        let dir = tempdir().unwrap();
        let result = extract(&dir.path().join("missing.tar.gz"), dir.path());
        assert!(matches!(result, Err(Error::Open { .. })));
    }

    #[test]
    fn write_file_copies_in_chunks() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("nested/big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();

        let written = write_file(&mut Cursor::new(data.clone()), &dest).unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn write_file_reports_content_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::InvalidData, "truncated"))
            }
        }

        let dir = tempdir().unwrap();
        let result = write_file(&mut Broken, &dir.path().join("file"));
        assert!(matches!(result, Err(Error::ContentRead { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn detects_symlinked_ancestors() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink("real", dir.path().join("link")).unwrap();

        assert!(routed_through_symlink(dir.path(), Path::new("link/file"), false));
        assert!(routed_through_symlink(dir.path(), Path::new("link"), true));
        assert!(!routed_through_symlink(dir.path(), Path::new("link"), false));
        assert!(!routed_through_symlink(dir.path(), Path::new("real/file"), false));
        assert!(!routed_through_symlink(dir.path(), Path::new("missing/link/file"), false));
    }

    #[cfg(unix)]
    #[test]
    fn write_file_replaces_planted_symlink() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside.txt");
        std::fs::write(&outside, "original").unwrap();
        let dest = dir.path().join("planted");
        std::os::unix::fs::symlink(&outside, &dest).unwrap();

        write_file(&mut Cursor::new(b"new".to_vec()), &dest).unwrap();

        assert_eq!(std::fs::read_to_string(&outside).unwrap(), "original");
        assert!(!std::fs::symlink_metadata(&dest).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }
}
