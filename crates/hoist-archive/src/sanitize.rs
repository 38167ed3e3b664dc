//! Entry name screening.
//!
//! Both predicates are pure: they look only at the declared names and never
//! touch the filesystem, so they run before anything is created. Links
//! extracted earlier are caught separately by the extractor, which refuses
//! destinations routed through them.

use std::path::{Component, Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The name walks upwards with `..`.
    ParentDir,
    /// Nothing remains after dropping root and `.` components.
    EmptyName,
    /// A link target is an absolute path.
    AbsoluteLink,
    /// A link target resolves above the extraction root.
    EscapingLink,
    /// An already extracted component of the destination is a symlink.
    ThroughSymlink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Extract at this path, relative to the output directory.
    Proceed(PathBuf),
    Skip(SkipReason),
}

impl Verdict {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

/// Decide whether an entry name may be extracted.
///
/// Names containing a `..` component, or whose base name contains `..`, are
/// skipped. Root and prefix components are dropped so absolute names land
/// under the output directory.
pub fn screen(name: &Path) -> Verdict {
    if name
        .file_name()
        .is_some_and(|base| base.to_string_lossy().contains(".."))
    {
        return Verdict::Skip(SkipReason::ParentDir);
    }

    let mut relative = PathBuf::new();
    for component in name.components() {
        match component {
            Component::ParentDir => return Verdict::Skip(SkipReason::ParentDir),
            Component::Normal(part) => relative.push(part),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }

    if relative.as_os_str().is_empty() {
        Verdict::Skip(SkipReason::EmptyName)
    } else {
        Verdict::Proceed(relative)
    }
}

/// Decide whether a symlink at `link` (relative to the output directory)
/// may point at `target`.
///
/// The target is resolved lexically from the link's parent; it must stay
/// within the output directory. On success the target is returned unchanged.
pub fn screen_link(link: &Path, target: &Path) -> Verdict {
    if target.as_os_str().is_empty() {
        return Verdict::Skip(SkipReason::EmptyName);
    }

    let mut depth = link
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);

    for component in target.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                return Verdict::Skip(SkipReason::AbsoluteLink);
            }
            Component::ParentDir => {
                if depth == 0 {
                    return Verdict::Skip(SkipReason::EscapingLink);
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
        }
    }

    Verdict::Proceed(target.to_path_buf())
}
