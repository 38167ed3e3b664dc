//! Filesystem primitives for installing an update in place.
//!
//! - `prepare.rs` - Directory chain creation with an explicit [`Undo`]
//! - `metadata.rs` - Best-effort mode, time and ownership restoration

mod error;
pub mod metadata;
mod prepare;

pub use error::{Error, Result};
pub use metadata::{BestEffort, FileTime, Ignored, IgnoredExt, MetaOp};
pub use prepare::{Undo, create_all, prepare_dir};
