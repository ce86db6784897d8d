//! Version ordering shared by the SQL queries and the in-memory row source
//!
//! Versions are ordered newest first: major, minor and patch numerically, a
//! release before any prerelease of the same triple, prerelease strings
//! byte-wise. Module path breaks the remaining ties so that a listing spanning
//! `example.com/mod` and `example.com/mod/v2` has a single total order.

use std::cmp::{Ordering, Reverse};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::version::types::VersionType;

/// Go pseudo-version forms:
/// - vX.0.0-yyyymmddhhmmss-abcdefabcdef (no base version)
/// - vX.Y.Z-pre.0.yyyymmddhhmmss-abcdefabcdef (base is a prerelease)
/// - vX.Y.(Z+1)-0.yyyymmddhhmmss-abcdefabcdef (base is a release)
static PSEUDO_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v[0-9]+\.(0\.0-|\d+\.\d+-([^+]*\.)?0\.)\d{14}-[A-Za-z0-9]+(\+[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?$",
    )
    .unwrap()
});

/// Prerelease value stored for releases so that `prerelease DESC` puts them first
pub const RELEASE_PRERELEASE_SENTINEL: &str = "~";

/// The orderable part of a version string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl VersionKey {
    /// Parse a version string, with or without the leading 'v'.
    ///
    /// Build metadata such as `+incompatible` does not take part in ordering
    /// and is dropped.
    pub fn parse(version: &str) -> Option<Self> {
        let stripped = version.strip_prefix('v').unwrap_or(version);
        let parsed = semver::Version::parse(stripped).ok()?;
        let prerelease = (!parsed.pre.is_empty()).then(|| parsed.pre.as_str().to_string());

        Some(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            prerelease,
        })
    }

    /// Prerelease as stored in the `versions.prerelease` column
    pub fn stored_prerelease(&self) -> &str {
        self.prerelease
            .as_deref()
            .unwrap_or(RELEASE_PRERELEASE_SENTINEL)
    }
}

impl Ord for VersionKey {
    /// Ascending order, oldest first
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reports how `(a_module, a_version)` orders against `(b_module, b_version)`
/// in a newest-first listing. `Ordering::Less` means `a` is listed first.
///
/// Versions that fail to parse are listed after every parseable version.
pub fn compare_desc(a_module: &str, a_version: &str, b_module: &str, b_version: &str) -> Ordering {
    let a = VersionKey::parse(a_version);
    let b = VersionKey::parse(b_version);
    b.cmp(&a)
        .then_with(|| b_module.cmp(a_module))
        .then_with(|| b_version.cmp(a_version))
}

/// Sort items newest first using the `(module_path, version)` returned by `key`
pub fn sort_desc<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (&str, &str),
{
    items.sort_by_cached_key(|item| {
        let (module_path, version) = key(item);
        (
            Reverse(parse_logged(module_path, version)),
            Reverse(module_path.to_string()),
            Reverse(version.to_string()),
        )
    });
}

/// Sort candidates for a latest lookup: module path descending, then newest
/// version first within each module path
pub fn sort_latest_desc<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (&str, &str),
{
    items.sort_by_cached_key(|item| {
        let (module_path, version) = key(item);
        (
            Reverse(module_path.to_string()),
            Reverse(parse_logged(module_path, version)),
            Reverse(version.to_string()),
        )
    });
}

fn parse_logged(module_path: &str, version: &str) -> Option<VersionKey> {
    let parsed = VersionKey::parse(version);
    if parsed.is_none() {
        warn!("Invalid version format: '{}@{}'", module_path, version);
    }
    parsed
}

/// Check if a version is a Go pseudo-version
pub fn is_pseudo_version(version: &str) -> bool {
    PSEUDO_VERSION_RE.is_match(version)
}

/// Determine the version type of a version string
///
/// Returns None when the string is not a valid version.
pub fn classify(version: &str) -> Option<VersionType> {
    let key = VersionKey::parse(version)?;
    if is_pseudo_version(version) {
        return Some(VersionType::Pseudo);
    }
    match key.prerelease {
        Some(_) => Some(VersionType::Prerelease),
        None => Some(VersionType::Release),
    }
}
