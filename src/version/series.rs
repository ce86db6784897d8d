//! Module series matching
//!
//! `example.com/mod`, `example.com/mod/v2` and `example.com/mod/v3` are
//! successive major versions of one logical module. They share the series
//! path `example.com/mod`, and a package is identified across them by its
//! suffix: `example.com/mod/foo` and `example.com/mod/v2/foo` are the same
//! package in different majors.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// Trailing `/vN` element with N >= 2 and no leading zero
static MAJOR_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)/v([2-9]|[1-9][0-9]+)$").unwrap());

/// gopkg.in carries the major version as `.vN` on the last element
static GOPKG_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(gopkg\.in/.+)\.v(0|[1-9][0-9]*)(-unstable)?$").unwrap());

/// Identity of a package across the major versions of its module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub series_path: String,
    /// Package path relative to the module root; empty is a valid key
    pub suffix: String,
}

/// Strip the major version element from a module path
pub fn series_path(module_path: &str) -> &str {
    if let Some(caps) = GOPKG_IN_RE.captures(module_path) {
        return caps.get(1).map_or(module_path, |m| m.as_str());
    }
    match MAJOR_SUFFIX_RE.captures(module_path) {
        Some(caps) => caps.get(1).map_or(module_path, |m| m.as_str()),
        None => module_path,
    }
}

pub fn series_key(module_path: &str, suffix: &str) -> SeriesKey {
    SeriesKey {
        series_path: series_path(module_path).to_string(),
        suffix: suffix.to_string(),
    }
}

/// Package suffix of `package_path` within `module_path`
///
/// Returns None if the package does not live under the module.
pub fn package_suffix<'a>(module_path: &str, package_path: &'a str) -> Option<&'a str> {
    if package_path == module_path {
        return Some("");
    }
    package_path
        .strip_prefix(module_path)
        .and_then(|rest| rest.strip_prefix('/'))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Member {
    module_path: String,
    version: String,
}

/// Index of package occurrences grouped by series key
#[derive(Debug, Default, Clone)]
pub struct SeriesIndex {
    members: HashMap<SeriesKey, BTreeSet<Member>>,
    keys_by_path: HashMap<String, BTreeSet<SeriesKey>>,
}

impl SeriesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `package_path` exists in `module_path@version` with `suffix`
    pub fn insert(&mut self, package_path: &str, module_path: &str, suffix: &str, version: &str) {
        let key = series_key(module_path, suffix);
        self.members.entry(key.clone()).or_default().insert(Member {
            module_path: module_path.to_string(),
            version: version.to_string(),
        });
        self.keys_by_path
            .entry(package_path.to_string())
            .or_default()
            .insert(key);
    }

    /// Series keys of every occurrence of `package_path`
    pub fn keys_for(&self, package_path: &str) -> impl Iterator<Item = &SeriesKey> {
        self.keys_by_path
            .get(package_path)
            .into_iter()
            .flat_map(|keys| keys.iter())
    }

    /// All `(module_path, version)` pairs whose package shares a series key
    /// with `package_path`
    pub fn match_series(&self, package_path: &str) -> BTreeSet<(String, String)> {
        self.keys_for(package_path)
            .filter_map(|key| self.members.get(key))
            .flatten()
            .map(|m| (m.module_path.clone(), m.version.clone()))
            .collect()
    }

    /// Whether a package at `module_path` with `suffix` belongs to the series of
    /// `package_path`
    pub fn in_series_of(&self, package_path: &str, module_path: &str, suffix: &str) -> bool {
        let candidate = series_key(module_path, suffix);
        self.keys_for(package_path).any(|key| *key == candidate)
    }
}
