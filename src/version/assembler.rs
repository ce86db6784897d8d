//! Folds the package rows of one module version into a [`Version`]

use crate::version::error::StoreError;
use crate::version::store::PackageRow;
use crate::version::types::Version;

/// Builds a [`Version`] from rows describing its packages.
///
/// Rows are expected in package path order and are kept in arrival order.
/// Version-level fields are taken from the last row pushed.
pub struct VersionAssembler {
    version: Version,
}

impl VersionAssembler {
    pub fn new(version: &str) -> Self {
        Self {
            version: Version::empty(version),
        }
    }

    pub fn push(&mut self, row: PackageRow) -> Result<(), StoreError> {
        let versioned = row.into_versioned_package()?;
        let info = versioned.version_info;

        self.version.module_path = info.module_path;
        self.version.readme_file_path = info.readme_file_path;
        self.version.readme_contents = info.readme_contents;
        self.version.commit_time = Some(info.commit_time);
        self.version.version_type = Some(info.version_type);
        self.version.packages.push(versioned.package);
        Ok(())
    }

    pub fn finish(self) -> Version {
        self.version
    }

    /// Assemble every row, stopping at the first row that fails to decode
    pub fn assemble<I>(version: &str, rows: I) -> Result<Version, StoreError>
    where
        I: IntoIterator<Item = PackageRow>,
    {
        let mut assembler = Self::new(version);
        for row in rows {
            assembler.push(row)?;
        }
        Ok(assembler.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::types::VersionType;
    use chrono::{TimeZone, Utc};

    fn row(path: &str, readme: &str) -> PackageRow {
        PackageRow {
            path: path.to_string(),
            series_path: "example.com/mod".to_string(),
            module_path: "example.com/mod".to_string(),
            version: "v1.2.0".to_string(),
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            synopsis: String::new(),
            suffix: path
                .strip_prefix("example.com/mod/")
                .unwrap_or_default()
                .to_string(),
            license_types: vec!["MIT".to_string()],
            license_paths: vec!["LICENSE".to_string()],
            readme_file_path: readme.to_string(),
            readme_contents: Vec::new(),
            commit_time: Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap(),
            version_type: VersionType::Release,
            documentation: Vec::new(),
        }
    }

    fn paths(version: &Version) -> Vec<&str> {
        version.packages.iter().map(|p| p.path.as_str()).collect()
    }

    #[test]
    fn assemble_preserves_row_order() {
        let rows = vec![
            row("example.com/mod/a", "README.md"),
            row("example.com/mod/b/c", "README.md"),
            row("example.com/mod/z", "README.md"),
        ];

        let version = VersionAssembler::assemble("v1.2.0", rows).unwrap();

        assert_eq!(
            paths(&version),
            vec!["example.com/mod/a", "example.com/mod/b/c", "example.com/mod/z"]
        );
        assert_eq!(version.module_path, "example.com/mod");
        assert_eq!(version.version_type, Some(VersionType::Release));
    }

    #[test]
    fn assemble_does_not_sort_rows() {
        let rows = vec![
            row("example.com/mod/z", "README.md"),
            row("example.com/mod/b/c", "README.md"),
            row("example.com/mod/a", "README.md"),
        ];

        let version = VersionAssembler::assemble("v1.2.0", rows).unwrap();

        assert_ne!(
            paths(&version),
            vec!["example.com/mod/a", "example.com/mod/b/c", "example.com/mod/z"]
        );
    }

    #[test]
    fn assemble_takes_version_fields_from_last_row() {
        let rows = vec![
            row("example.com/mod/a", "README"),
            row("example.com/mod/b", "README.md"),
        ];

        let version = VersionAssembler::assemble("v1.2.0", rows).unwrap();

        assert_eq!(version.readme_file_path, "README.md");
    }

    #[test]
    fn assemble_of_no_rows_is_empty_version() {
        let version = VersionAssembler::assemble("v1.2.0", Vec::new()).unwrap();

        assert_eq!(version, Version::empty("v1.2.0"));
    }

    #[test]
    fn assemble_fails_on_inconsistent_row() {
        let mut broken = row("example.com/mod/b", "README.md");
        broken.license_paths.clear();
        let rows = vec![row("example.com/mod/a", "README.md"), broken];

        let result = VersionAssembler::assemble("v1.2.0", rows);

        assert!(matches!(result, Err(StoreError::Inconsistency(_))));
    }
}
