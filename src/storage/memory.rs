//! In-memory row source
//!
//! Holds the same relations as the SQLite schema and answers every
//! [`RowSource`] read with the ordering the SQL queries produce, using the
//! in-memory comparator and series index instead of `ORDER BY` and joins.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::version::error::StoreError;
use crate::version::license::License;
use crate::version::semver::{VersionKey, sort_desc, sort_latest_desc};
use crate::version::series::{SeriesIndex, package_suffix, series_path};
use crate::version::store::{CancelToken, PackageRow, RowSource, SeriesVersionRow};
use crate::version::types::{Import, Package, VersionInfo, VersionType};

#[derive(Debug, Clone)]
struct StoredPackage {
    module_path: String,
    version: String,
    package: Package,
}

#[derive(Debug, Default)]
struct Tables {
    /// Keyed by `(module_path, version)`
    versions: BTreeMap<(String, String), VersionInfo>,
    packages: Vec<StoredPackage>,
    /// Keyed by `(module_path, version, file_path)`
    licenses: BTreeMap<(String, String, String), License>,
    /// Keyed by `(from_path, from_version, to_path)`
    imports: BTreeMap<(String, String, String), String>,
    series: SeriesIndex,
}

impl Tables {
    fn has_license(&self, module_path: &str, version: &str, file_path: &str) -> bool {
        self.licenses.contains_key(&(
            module_path.to_string(),
            version.to_string(),
            file_path.to_string(),
        ))
    }

    /// Join a stored package with its version and its license files
    fn package_row(&self, stored: &StoredPackage) -> Option<PackageRow> {
        let info = self
            .versions
            .get(&(stored.module_path.clone(), stored.version.clone()))?;

        let (license_types, license_paths): (Vec<String>, Vec<String>) = stored
            .package
            .licenses
            .iter()
            .filter(|l| self.has_license(&stored.module_path, &stored.version, &l.file_path))
            .map(|l| (l.license_type.clone(), l.file_path.clone()))
            .unzip();

        Some(PackageRow {
            path: stored.package.path.clone(),
            series_path: series_path(&stored.module_path).to_string(),
            module_path: stored.module_path.clone(),
            version: stored.version.clone(),
            name: stored.package.name.clone(),
            synopsis: stored.package.synopsis.clone(),
            suffix: stored.package.suffix.clone(),
            license_types,
            license_paths,
            readme_file_path: info.readme_file_path.clone(),
            readme_contents: info.readme_contents.clone(),
            commit_time: info.commit_time,
            version_type: info.version_type,
            documentation: stored.package.documentation.clone(),
        })
    }

    fn package_rows<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = PackageRow> + 'a
    where
        P: Fn(&StoredPackage) -> bool + 'a,
    {
        self.packages
            .iter()
            .filter(move |stored| predicate(stored))
            .filter_map(move |stored| self.package_row(stored))
    }
}

/// Row source backed by in-process maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_tables(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_tables(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Add a module version, replacing any previous one with the same key
    pub fn insert_version(&self, info: VersionInfo) -> Result<(), StoreError> {
        if VersionKey::parse(&info.version).is_none() {
            return Err(StoreError::InvalidArgument(format!(
                "invalid version '{}' for module '{}'",
                info.version, info.module_path
            )));
        }

        let mut tables = self.write_tables()?;
        tables
            .versions
            .insert((info.module_path.clone(), info.version.clone()), info);
        Ok(())
    }

    /// Add a package to an existing module version.
    ///
    /// `package.licenses` names the license files that apply to the package;
    /// only files also added with [`insert_license`](Self::insert_license)
    /// are reported.
    pub fn insert_package(
        &self,
        module_path: &str,
        version: &str,
        package: Package,
    ) -> Result<(), StoreError> {
        if package_suffix(module_path, &package.path) != Some(package.suffix.as_str()) {
            return Err(StoreError::InvalidArgument(format!(
                "package '{}' with suffix '{}' is not part of module '{}'",
                package.path, package.suffix, module_path
            )));
        }

        let mut tables = self.write_tables()?;
        if !tables
            .versions
            .contains_key(&(module_path.to_string(), version.to_string()))
        {
            return Err(StoreError::NotFound(format!("{}@{}", module_path, version)));
        }

        tables
            .series
            .insert(&package.path, module_path, &package.suffix, version);
        tables.packages.retain(|p| {
            !(p.package.path == package.path && p.module_path == module_path && p.version == version)
        });
        tables.packages.push(StoredPackage {
            module_path: module_path.to_string(),
            version: version.to_string(),
            package,
        });
        Ok(())
    }

    /// Add a license file of a module version
    pub fn insert_license(
        &self,
        module_path: &str,
        version: &str,
        license: License,
    ) -> Result<(), StoreError> {
        let mut tables = self.write_tables()?;
        tables.licenses.insert(
            (
                module_path.to_string(),
                version.to_string(),
                license.metadata.file_path.clone(),
            ),
            license,
        );
        Ok(())
    }

    /// Record that `from_path@from_version` imports `import`
    pub fn insert_import(
        &self,
        from_path: &str,
        from_version: &str,
        import: Import,
    ) -> Result<(), StoreError> {
        let mut tables = self.write_tables()?;
        tables.imports.insert(
            (from_path.to_string(), from_version.to_string(), import.path),
            import.name,
        );
        Ok(())
    }
}

impl RowSource for MemoryStore {
    fn package_row(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Option<PackageRow>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        Ok(tables
            .package_rows(|p| p.package.path == path && p.version == version)
            .min_by(|a, b| a.module_path.cmp(&b.module_path)))
    }

    fn latest_package_row(
        &self,
        cancel: &CancelToken,
        path: &str,
    ) -> Result<Option<PackageRow>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        let mut rows: Vec<PackageRow> = tables.package_rows(|p| p.package.path == path).collect();
        sort_latest_desc(&mut rows, |r| (r.module_path.as_str(), r.version.as_str()));
        Ok(rows.into_iter().next())
    }

    fn version_package_rows(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<PackageRow>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        let modules: BTreeSet<&str> = tables
            .packages
            .iter()
            .filter(|p| p.package.path == path)
            .map(|p| p.module_path.as_str())
            .collect();

        let mut rows: Vec<PackageRow> = tables
            .package_rows(|p| p.version == version && modules.contains(p.module_path.as_str()))
            .collect();
        rows.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.module_path.cmp(&b.module_path))
        });
        Ok(rows)
    }

    fn series_versions(
        &self,
        cancel: &CancelToken,
        path: &str,
        version_types: &[VersionType],
        limit: Option<usize>,
    ) -> Result<Vec<SeriesVersionRow>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        let mut rows: Vec<SeriesVersionRow> = tables
            .packages
            .iter()
            .filter(|p| {
                tables
                    .series
                    .in_series_of(path, &p.module_path, &p.package.suffix)
            })
            .filter_map(|p| {
                let info = tables
                    .versions
                    .get(&(p.module_path.clone(), p.version.clone()))?;
                version_types
                    .contains(&info.version_type)
                    .then(|| SeriesVersionRow {
                        series_path: series_path(&p.module_path).to_string(),
                        module_path: info.module_path.clone(),
                        version: info.version.clone(),
                        version_type: info.version_type,
                        commit_time: info.commit_time,
                        synopsis: p.package.synopsis.clone(),
                    })
            })
            .collect();

        sort_desc(&mut rows, |r| (r.module_path.as_str(), r.version.as_str()));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        debug!(path, ?version_types, count = rows.len(), "Listed series versions");
        Ok(rows)
    }

    fn version_info(
        &self,
        cancel: &CancelToken,
        module_path: &str,
        version: &str,
    ) -> Result<Option<VersionInfo>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        Ok(tables
            .versions
            .get(&(module_path.to_string(), version.to_string()))
            .cloned())
    }

    fn imports(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<Import>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        // BTreeMap iteration is already ordered by to_path
        Ok(tables
            .imports
            .iter()
            .filter(|((from_path, from_version, _), _)| from_path == path && from_version == version)
            .map(|((_, _, to_path), name)| Import {
                path: to_path.clone(),
                name: name.clone(),
            })
            .collect())
    }

    fn imported_by(&self, cancel: &CancelToken, path: &str) -> Result<Vec<String>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        let importers: BTreeSet<&String> = tables
            .imports
            .keys()
            .filter(|(_, _, to_path)| to_path == path)
            .map(|(from_path, _, _)| from_path)
            .collect();
        Ok(importers.into_iter().cloned().collect())
    }

    fn licenses(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<License>, StoreError> {
        cancel.check()?;
        let tables = self.read_tables()?;

        let files = &tables.licenses;
        let mut licenses: Vec<License> = tables
            .packages
            .iter()
            .filter(|p| p.package.path == path && p.version == version)
            .flat_map(|p| {
                p.package.licenses.iter().filter_map(move |metadata| {
                    files.get(&(
                        p.module_path.clone(),
                        p.version.clone(),
                        metadata.file_path.clone(),
                    ))
                })
            })
            .cloned()
            .collect();
        licenses.sort_by(|a, b| a.metadata.file_path.cmp(&b.metadata.file_path));
        Ok(licenses)
    }
}
