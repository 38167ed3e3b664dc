use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use hoist_fs::FileTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Pack the tree under `root` into a gzip-compressed tar at `archive`.
///
/// Entry names are relative to `root`, which itself is not recorded. Links
/// are stored as links: the target is the link's resolved path, relative to
/// the link when it stays inside `root`, absolute otherwise.
pub fn pack_tar_gz(root: impl AsRef<Path>, archive: impl AsRef<Path>) -> Result<()> {
    let root = root.as_ref();
    let archive = archive.as_ref();
    let failed = |path: &Path| {
        let path = path.to_path_buf();
        move |source| Error::PackFailed { path, source }
    };

    let real_root = fs::canonicalize(root).map_err(failed(root))?;
    let file = File::create(archive).map_err(failed(archive))?;
    let mut builder = tar::Builder::new(GzEncoder::new(BufWriter::new(file), Compression::default()));
    builder.follow_symlinks(false);

    for entry in WalkDir::new(root).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::PackFailed {
                path,
                source: io::Error::from(e),
            }
        })?;
        append(&mut builder, entry.path(), root, &real_root).map_err(failed(entry.path()))?;
    }

    let encoder = builder.into_inner().map_err(failed(archive))?;
    let mut writer = encoder.finish().map_err(failed(archive))?;
    writer.flush().map_err(failed(archive))?;

    Ok(())
}

fn append<W: Write>(builder: &mut tar::Builder<W>, path: &Path, root: &Path, real_root: &Path) -> io::Result<()> {
    let name = path
        .strip_prefix(root)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let meta = fs::symlink_metadata(path)?;

    let mut header = tar::Header::new_gnu();
    header.set_metadata_in_mode(&meta, tar::HeaderMode::Complete);
    if let Some(gnu) = header.as_gnu_mut() {
        let atime = FileTime::from_last_access_time(&meta).unix_seconds();
        gnu.set_atime(u64::try_from(atime).unwrap_or(0));
    }

    let file_type = meta.file_type();
    if file_type.is_dir() {
        header.set_size(0);
        builder.append_data(&mut header, name, io::empty())
    } else if file_type.is_symlink() {
        let target = link_target(path, real_root)?;
        debug!(entry = %name.display(), target = %target.display(), "packing symlink");
        header.set_size(0);
        builder.append_link(&mut header, name, &target)
    } else if file_type.is_file() {
        let file = File::open(path)?;
        builder.append_data(&mut header, name, file)
    } else {
        debug!(entry = %name.display(), "not packing special file");
        Ok(())
    }
}

fn link_target(link: &Path, real_root: &Path) -> io::Result<PathBuf> {
    let resolved = match fs::canonicalize(link) {
        Ok(resolved) => resolved,
        // Dangling links keep their literal target.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return fs::read_link(link),
        Err(e) => return Err(e),
    };

    let real_parent = match link.parent() {
        Some(parent) => fs::canonicalize(parent)?,
        None => return Ok(resolved),
    };

    if resolved.starts_with(real_root) {
        Ok(relative_to(&real_parent, &resolved))
    } else {
        Ok(resolved)
    }
}

/// Path leading from directory `from` to `to`; both must be absolute.
fn relative_to(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}
