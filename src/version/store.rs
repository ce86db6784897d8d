//! Row source abstraction
//!
//! A row source is the storage collaborator of the resolver. It answers a
//! small set of keyed reads with rows already shaped by the join/projection
//! the resolver needs, ordered as documented on each method. Implementations
//! are blocking; the resolver moves every call onto the blocking pool and
//! hands it a [`CancelToken`] that flips when the caller gives up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::version::error::StoreError;
use crate::version::license::{License, zip_license_metadata};
use crate::version::types::{Import, Package, VersionInfo, VersionType, VersionedPackage};

/// Cancellation flag shared between a caller and the storage call it started
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fail with [`StoreError::Cancelled`] if the token was cancelled
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled("cancelled by caller".to_string()));
        }
        Ok(())
    }

    /// Guard that cancels the token when dropped
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

pub struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// One package within one module version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRow {
    pub path: String,
    pub series_path: String,
    pub module_path: String,
    pub version: String,
    pub name: String,
    pub synopsis: String,
    pub suffix: String,
    /// Parallel to `license_paths`
    pub license_types: Vec<String>,
    pub license_paths: Vec<String>,
    pub readme_file_path: String,
    pub readme_contents: Vec<u8>,
    pub commit_time: DateTime<Utc>,
    pub version_type: VersionType,
    pub documentation: Vec<u8>,
}

impl PackageRow {
    /// Split the row into its package and version parts, zipping the licenses
    pub fn into_versioned_package(self) -> Result<VersionedPackage, StoreError> {
        let licenses = zip_license_metadata(&self.license_types, &self.license_paths)?;

        Ok(VersionedPackage {
            package: Package {
                path: self.path,
                name: self.name,
                synopsis: self.synopsis,
                suffix: self.suffix,
                licenses,
                documentation: self.documentation,
            },
            version_info: VersionInfo {
                module_path: self.module_path,
                version: self.version,
                version_type: self.version_type,
                commit_time: self.commit_time,
                readme_file_path: self.readme_file_path,
                readme_contents: self.readme_contents,
            },
        })
    }
}

/// One version of a package series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesVersionRow {
    pub series_path: String,
    pub module_path: String,
    pub version: String,
    pub version_type: VersionType,
    pub commit_time: DateTime<Utc>,
    pub synopsis: String,
}

impl From<SeriesVersionRow> for VersionInfo {
    fn from(row: SeriesVersionRow) -> Self {
        VersionInfo {
            module_path: row.module_path,
            version: row.version,
            version_type: row.version_type,
            commit_time: row.commit_time,
            readme_file_path: String::new(),
            readme_contents: Vec::new(),
        }
    }
}

/// Trait for reading registry rows
#[cfg_attr(test, automock)]
pub trait RowSource: Send + Sync + 'static {
    /// Package `path` at exactly `version`; the first match if several modules
    /// provide it
    fn package_row(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Option<PackageRow>, StoreError>;

    /// Package `path` from the greatest module path providing it, at that
    /// module's newest version
    fn latest_package_row(
        &self,
        cancel: &CancelToken,
        path: &str,
    ) -> Result<Option<PackageRow>, StoreError>;

    /// Every package of the module version(s) at `version` that contain
    /// `path`, ordered by package path ascending
    fn version_package_rows(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<PackageRow>, StoreError>;

    /// Versions of every package in the series of `path` whose type is in
    /// `version_types`, newest first, at most `limit` rows
    fn series_versions(
        &self,
        cancel: &CancelToken,
        path: &str,
        version_types: &[VersionType],
        limit: Option<usize>,
    ) -> Result<Vec<SeriesVersionRow>, StoreError>;

    /// Module version by primary key
    fn version_info(
        &self,
        cancel: &CancelToken,
        module_path: &str,
        version: &str,
    ) -> Result<Option<VersionInfo>, StoreError>;

    /// Imports of `path@version`, ordered by import path then name
    fn imports(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<Import>, StoreError>;

    /// Distinct paths of packages importing `path`, ascending
    fn imported_by(&self, cancel: &CancelToken, path: &str) -> Result<Vec<String>, StoreError>;

    /// License files applying to `path@version`, any order
    fn licenses(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<License>, StoreError>;
}
