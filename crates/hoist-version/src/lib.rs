//! Release version parsing and comparison.
//!
//! Release tags are rarely strict SemVer: they carry a `v` prefix or omit
//! trailing components. [`Version`] accepts those forms and compares with
//! SemVer precedence; [`greater_than`] and [`is_newer`] work on raw strings
//! and treat anything unparsable as never newer.

pub use self::version::{Version, VersionError, greater_than, is_newer};

mod version;
