//! Version types and operations.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static LENIENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?<major>[0-9]+)(?:\.(?<minor>[0-9]+))?(?:\.(?<patch>[0-9]+))?(?:-(?<pre>[0-9A-Za-z][-0-9A-Za-z.]*))?(?:\+(?<build>[-0-9A-Za-z.]+))?$").unwrap()
});

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid version: {0:?}")]
    Invalid(String),
    #[error("invalid semver")]
    SemVer(#[from] semver::Error),
}

/// A release version compared with SemVer precedence.
///
/// Parsing strips a leading `v`/`V` and fills missing minor and patch
/// components with zero, so `v1.2` equals `1.2.0`. Build metadata is kept
/// but ignored for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(semver::Version);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix(['v', 'V'])
            .unwrap_or(trimmed);

        if let Ok(v) = semver::Version::parse(trimmed) {
            return Ok(Self(v));
        }

        let caps = LENIENT_REGEX
            .captures(trimmed)
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;
        let component = |name| caps.name(name).map_or("0", |m| m.as_str());

        let mut full = format!(
            "{}.{}.{}",
            component("major"),
            component("minor"),
            component("patch")
        );
        if let Some(pre) = caps.name("pre") {
            full.push('-');
            full.push_str(pre.as_str());
        }
        if let Some(build) = caps.name("build") {
            full.push('+');
            full.push_str(build.as_str());
        }

        Ok(Self(semver::Version::parse(&full)?))
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Version::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether `a` is a strictly greater version than `b`.
///
/// Returns `false` when either side fails to parse.
pub fn greater_than(a: &str, b: &str) -> bool {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a > b,
        _ => false,
    }
}

/// Whether `candidate` should replace `current`.
///
/// Prerelease candidates only qualify when `allow_prereleases` is set.
pub fn is_newer(candidate: &str, current: &str, allow_prereleases: bool) -> bool {
    let (Ok(candidate), Ok(current)) = (Version::parse(candidate), Version::parse(current)) else {
        return false;
    };
    if candidate.is_prerelease() && !allow_prereleases {
        return false;
    }
    candidate > current
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strict_semver() {
        let v: Version = "1.2.3-rc.1+build.5".parse().unwrap();
        assert_eq!(v.to_string(), "1.2.3-rc.1+build.5");
        assert!(v.is_prerelease());
    }

    #[test]
    fn test_leading_v_and_partial() {
        assert_eq!(Version::parse("v1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(Version::parse("V3").unwrap(), Version::new(3, 0, 0));
        assert_eq!(Version::parse(" 0.9.1 ").unwrap(), Version::new(0, 9, 1));
        assert_eq!(Version::parse("1.4-beta").unwrap().to_string(), "1.4.0-beta");
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(Version::parse("latest"), Err(VersionError::Invalid(_))));
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
    }

    #[test]
    fn test_greater_than() {
        assert!(greater_than("v1.10.0", "1.9.3"));
        assert!(greater_than("1.0.0", "1.0.0-rc.2"));
        assert!(!greater_than("1.0.0", "1.0.0"));
        assert!(!greater_than("1.0.0+a", "1.0.0+b"));
        assert!(!greater_than("nightly", "1.0.0"));
        assert!(!greater_than("2.0.0", "dev"));
    }

    #[test]
    fn test_is_newer_prereleases() {
        assert!(is_newer("1.3.0-beta.1", "1.2.0", true));
        assert!(!is_newer("1.3.0-beta.1", "1.2.0", false));
        assert!(is_newer("1.3.0", "1.3.0-beta.1", false));
    }

    #[test]
    fn test_deserialize_from_string() {
        use serde::de::IntoDeserializer;
        use serde::de::value::{Error, StrDeserializer};

        let de: StrDeserializer<'_, Error> = "v2.1".into_deserializer();
        assert_eq!(Version::deserialize(de).unwrap(), Version::new(2, 1, 0));
    }

    #[test]
    fn test_build_metadata_ignored_for_equality() {
        assert_eq!(Version::parse("1.0.0+a").unwrap(), Version::parse("1.0.0+b").unwrap());
    }

    proptest! {
        #[test]
        fn prop_prefix_is_ignored(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let plain = format!("{major}.{minor}.{patch}");
            prop_assert_eq!(Version::parse(&plain).unwrap(), Version::parse(&format!("v{plain}")).unwrap());
        }

        #[test]
        fn prop_greater_than_is_asymmetric(a in (0u64..50, 0u64..50, 0u64..50), b in (0u64..50, 0u64..50, 0u64..50)) {
            let a = format!("{}.{}.{}", a.0, a.1, a.2);
            let b = format!("{}.{}.{}", b.0, b.1, b.2);
            prop_assert!(!(greater_than(&a, &b) && greater_than(&b, &a)));
            prop_assert_eq!(greater_than(&a, &b), Version::parse(&a).unwrap() > Version::parse(&b).unwrap());
        }

        #[test]
        fn prop_missing_components_are_zero(major in 0u64..1000, minor in 0u64..1000) {
            prop_assert_eq!(
                Version::parse(&format!("{major}.{minor}")).unwrap(),
                Version::new(major, minor, 0)
            );
        }
    }
}
