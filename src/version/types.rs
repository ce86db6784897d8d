//! Common types shared by the row sources and the resolver

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::version::license::LicenseMetadata;
use crate::version::semver::classify;

/// Kind of a module version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    /// Tagged version without a prerelease (v1.2.3)
    Release,
    /// Tagged version with a prerelease (v1.2.3-beta.1)
    Prerelease,
    /// Synthesized version for an untagged commit (v0.0.0-20210101000000-abcdef123456)
    Pseudo,
}

impl VersionType {
    /// Returns the string stored for this version type
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionType::Release => "release",
            VersionType::Prerelease => "prerelease",
            VersionType::Pseudo => "pseudo",
        }
    }
}

impl std::fmt::Display for VersionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown version type '{0}'")]
pub struct ParseVersionTypeError(pub String);

impl std::str::FromStr for VersionType {
    type Err = ParseVersionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(VersionType::Release),
            "prerelease" => Ok(VersionType::Prerelease),
            "pseudo" => Ok(VersionType::Pseudo),
            _ => Err(ParseVersionTypeError(s.to_string())),
        }
    }
}

/// One version of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub module_path: String,
    pub version: String,
    pub version_type: VersionType,
    pub commit_time: DateTime<Utc>,
    pub readme_file_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub readme_contents: Vec<u8>,
}

impl VersionInfo {
    /// Version info with the type derived from the version string.
    ///
    /// Returns None when `version` is not a valid version.
    pub fn new(module_path: &str, version: &str, commit_time: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            module_path: module_path.to_string(),
            version: version.to_string(),
            version_type: classify(version)?,
            commit_time,
            readme_file_path: String::new(),
            readme_contents: Vec::new(),
        })
    }
}

/// One importable unit within a module version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub synopsis: String,
    /// Package path relative to the module root, empty for the root package
    pub suffix: String,
    pub licenses: Vec<LicenseMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub documentation: Vec<u8>,
}

/// A package together with the module version it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedPackage {
    pub package: Package,
    pub version_info: VersionInfo,
}

/// A module version with all of its packages, ordered by package path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub module_path: String,
    pub version: String,
    pub version_type: Option<VersionType>,
    pub commit_time: Option<DateTime<Utc>>,
    pub readme_file_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub readme_contents: Vec<u8>,
    pub packages: Vec<Package>,
}

impl Version {
    /// Creates a version that has no packages yet
    pub fn empty(version: &str) -> Self {
        Self {
            module_path: String::new(),
            version: version.to_string(),
            version_type: None,
            commit_time: None,
            readme_file_path: String::new(),
            readme_contents: Vec::new(),
            packages: Vec::new(),
        }
    }
}

/// A package imported by another package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub path: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(VersionType::Release, "release")]
    #[case(VersionType::Prerelease, "prerelease")]
    #[case(VersionType::Pseudo, "pseudo")]
    fn version_type_round_trips_through_storage_string(
        #[case] version_type: VersionType,
        #[case] stored: &str,
    ) {
        assert_eq!(version_type.as_str(), stored);
        assert_eq!(stored.parse::<VersionType>(), Ok(version_type));
    }

    #[test]
    fn version_type_rejects_unknown_string() {
        let err = "tagged".parse::<VersionType>().unwrap_err();

        assert_eq!(err, ParseVersionTypeError("tagged".to_string()));
        assert_eq!(err.to_string(), "unknown version type 'tagged'");
    }

    #[rstest]
    #[case("v1.2.3", Some(VersionType::Release))]
    #[case("v1.2.3-rc.1", Some(VersionType::Prerelease))]
    #[case("v0.0.0-20190130000000-abcdefabcdef", Some(VersionType::Pseudo))]
    #[case("latest", None)]
    fn version_info_new_classifies_version(
        #[case] version: &str,
        #[case] expected: Option<VersionType>,
    ) {
        let commit_time = Utc::now();
        let info = VersionInfo::new("example.com/mod", version, commit_time);

        assert_eq!(info.as_ref().map(|i| i.version_type), expected);
        if let Some(info) = info {
            assert_eq!(info.module_path, "example.com/mod");
            assert_eq!(info.commit_time, commit_time);
        }
    }

    #[test]
    fn empty_version_only_sets_version_string() {
        let version = Version::empty("v1.0.0");

        assert_eq!(version.version, "v1.0.0");
        assert!(version.module_path.is_empty());
        assert!(version.packages.is_empty());
        assert_eq!(version.commit_time, None);
        assert_eq!(version.version_type, None);
    }
}
