use std::io::Read;
use std::path::PathBuf;

use hoist_fs::FileTime;

use crate::error::{Error, Result};

/// Kind of record found in the archive stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    HardLink,
    /// Devices, fifos and other records that are never materialized.
    Other(u8),
}

/// Metadata of one archive entry, detached from its content stream.
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    pub name: PathBuf,
    pub kind: EntryKind,
    /// `None` when the header field is blank or unreadable.
    pub mode: Option<u32>,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
    pub atime: FileTime,
    pub mtime: FileTime,
    pub link_target: Option<PathBuf>,
}

impl ArchiveEntry {
    /// Read the header of `entry`, honoring PAX overrides for timestamps.
    ///
    /// Numeric fields are decoded leniently: a blank or malformed mode, uid or
    /// gid becomes `None` and a blank mtime reads as the epoch.
    pub fn from_tar<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<Self> {
        let (pax_atime, pax_mtime) = pax_times(entry)?;

        let name = entry.path().map_err(invalid)?.into_owned();
        let link_target = entry
            .link_name()
            .map_err(invalid)?
            .map(|target| target.into_owned());
        let legacy_dir = entry.path_bytes().ends_with(b"/");

        let header = entry.header();
        let kind = kind_of(header.as_old().linkflag[0], legacy_dir);
        let mode = header.mode().ok();
        let uid = header.uid().ok();
        let gid = header.gid().ok();

        let mtime = pax_mtime
            .unwrap_or_else(|| FileTime::from_unix_time(header.mtime().map(clamp_secs).unwrap_or(0), 0));
        let atime = pax_atime
            .or_else(|| {
                header
                    .as_gnu()
                    .and_then(|gnu| gnu.atime().ok())
                    .filter(|secs| *secs > 0)
                    .map(|secs| FileTime::from_unix_time(clamp_secs(secs), 0))
            })
            .unwrap_or(mtime);

        Ok(Self {
            name,
            kind,
            mode,
            uid,
            gid,
            atime,
            mtime,
            link_target,
        })
    }

    /// Owner ids, only when both were readable.
    pub fn owner(&self) -> Option<(u64, u64)> {
        self.uid.zip(self.gid)
    }
}

fn clamp_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

pub(crate) fn invalid(source: std::io::Error) -> Error {
    Error::InvalidEntry { source }
}

fn kind_of(typeflag: u8, legacy_dir: bool) -> EntryKind {
    // Pre-POSIX archives mark directories only with a trailing slash.
    if typeflag == b'\0' && legacy_dir {
        return EntryKind::Directory;
    }

    let entry_type = tar::EntryType::new(typeflag);
    if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_symlink() {
        EntryKind::Symlink
    } else if entry_type.is_hard_link() {
        EntryKind::HardLink
    } else if entry_type.is_file() || entry_type.is_contiguous() || entry_type.is_gnu_sparse() {
        EntryKind::File
    } else {
        EntryKind::Other(entry_type.as_byte())
    }
}

fn pax_times<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<(Option<FileTime>, Option<FileTime>)> {
    let mut atime = None;
    let mut mtime = None;

    let Some(extensions) = entry.pax_extensions().map_err(invalid)? else {
        return Ok((atime, mtime));
    };

    for extension in extensions {
        let extension = extension.map_err(invalid)?;
        let (Ok(key), Ok(value)) = (extension.key(), extension.value()) else {
            continue;
        };
        match key {
            "atime" => atime = parse_pax_time(value),
            "mtime" => mtime = parse_pax_time(value),
            _ => {}
        }
    }

    Ok((atime, mtime))
}

/// Parse a PAX decimal timestamp such as `1700000000.25`.
pub(crate) fn parse_pax_time(value: &str) -> Option<FileTime> {
    let (secs, frac) = match value.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (value, ""),
    };
    let secs: i64 = secs.parse().ok()?;

    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = &frac[..frac.len().min(9)];
    let nanos = if digits.is_empty() {
        0
    } else {
        digits.parse::<u32>().ok()? * 10u32.pow(9 - digits.len() as u32)
    };

    Some(FileTime::from_unix_time(secs, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pax_time_whole_seconds() {
        assert_eq!(
            parse_pax_time("1700000000"),
            Some(FileTime::from_unix_time(1_700_000_000, 0))
        );
    }

    #[test]
    fn pax_time_fraction_is_scaled() {
        assert_eq!(
            parse_pax_time("1700000000.25"),
            Some(FileTime::from_unix_time(1_700_000_000, 250_000_000))
        );
    }

    #[test]
    fn pax_time_truncates_beyond_nanoseconds() {
        assert_eq!(
            parse_pax_time("1.1234567891"),
            Some(FileTime::from_unix_time(1, 123_456_789))
        );
    }

    #[test]
    fn pax_time_rejects_garbage() {
        assert_eq!(parse_pax_time("soon"), None);
        assert_eq!(parse_pax_time("12.x"), None);
    }

    #[test]
    fn oversized_seconds_saturate() {
        assert_eq!(clamp_secs(u64::MAX), i64::MAX);
        assert_eq!(clamp_secs(1_700_000_000), 1_700_000_000);
    }

    #[test]
    fn owner_needs_both_ids() {
        let mut header = tar::Header::new_gnu();
        header.set_path("file").unwrap();
        header.set_size(0);
        header.set_cksum();
        let data = {
            let mut builder = tar::Builder::new(Vec::new());
            builder.append(&header, std::io::empty()).unwrap();
            builder.into_inner().unwrap()
        };

        let mut archive = tar::Archive::new(data.as_slice());
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let meta = ArchiveEntry::from_tar(&mut entry).unwrap();
        assert_eq!(meta.uid, None);
        assert_eq!(meta.gid, None);
        assert_eq!(meta.owner(), None);
        assert_eq!(meta.mtime, FileTime::from_unix_time(0, 0));
    }

    #[test]
    fn entry_kinds() {
        assert_eq!(kind_of(b'0', false), EntryKind::File);
        assert_eq!(kind_of(b'\0', false), EntryKind::File);
        assert_eq!(kind_of(b'5', false), EntryKind::Directory);
        assert_eq!(kind_of(b'2', false), EntryKind::Symlink);
        assert_eq!(kind_of(b'1', false), EntryKind::HardLink);
        assert_eq!(kind_of(b'6', false), EntryKind::Other(b'6'));
        assert_eq!(kind_of(b'\0', true), EntryKind::Directory);
        assert_eq!(kind_of(b'0', true), EntryKind::File);
    }
}
