//! tar.gz installation with path screening and rollback.
//!
//! # Architecture
//!
//! - `install.rs` - Request resolution, output preparation and rollback
//! - `extract.rs` - Streaming extraction of entries in archive order
//! - `sanitize.rs` - Pure name and link-target screening
//! - `entry.rs` - Header decoding, including PAX and GNU timestamps
//! - `deferred.rs` - Directory metadata applied after the last entry
//! - `pack.rs` - Building tar.gz archives from a directory tree

pub use deferred::DeferredDirs;
pub use entry::{ArchiveEntry, EntryKind};
pub use error::{Error, Result};
pub use extract::{extract, extract_from_reader};
pub use install::{UpdateRequest, extract_tar_gz};
pub use pack::pack_tar_gz;
pub use report::Report;
pub use sanitize::{SkipReason, Verdict, screen, screen_link};

mod deferred;
pub mod entry;
mod error;
pub mod extract;
mod install;
pub mod pack;
mod report;
pub mod sanitize;
