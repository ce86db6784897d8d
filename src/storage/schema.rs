//! SQLite schema read by [`Database`](crate::storage::sqlite::Database)
//!
//! The crate never writes these tables. The schema is published so that
//! loaders and test fixtures create exactly the shape the queries expect.
//!
//! `versions.prerelease` holds the prerelease of the version, or `'~'` for a
//! release, so that `ORDER BY prerelease DESC` lists a release before its
//! prereleases. `vw_licensed_packages` aggregates the license type and path
//! of each package into two JSON arrays built in the same aggregate pass,
//! which keeps them positionally aligned.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS modules (
    path TEXT PRIMARY KEY,
    series_path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    module_path TEXT NOT NULL REFERENCES modules(path),
    version TEXT NOT NULL,
    major INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    patch INTEGER NOT NULL,
    prerelease TEXT NOT NULL,
    version_type TEXT NOT NULL CHECK (version_type IN ('release', 'prerelease', 'pseudo')),
    commit_time TEXT NOT NULL,
    readme_file_path TEXT NOT NULL DEFAULT '',
    readme_contents BLOB NOT NULL DEFAULT x'',
    PRIMARY KEY (module_path, version)
);

CREATE TABLE IF NOT EXISTS packages (
    path TEXT NOT NULL,
    module_path TEXT NOT NULL,
    version TEXT NOT NULL,
    name TEXT NOT NULL,
    synopsis TEXT NOT NULL DEFAULT '',
    suffix TEXT NOT NULL DEFAULT '',
    documentation BLOB NOT NULL DEFAULT x'',
    PRIMARY KEY (path, module_path, version),
    FOREIGN KEY (module_path, version) REFERENCES versions(module_path, version)
);

CREATE INDEX IF NOT EXISTS idx_packages_module_version ON packages(module_path, version);

CREATE TABLE IF NOT EXISTS licenses (
    module_path TEXT NOT NULL,
    version TEXT NOT NULL,
    file_path TEXT NOT NULL,
    type TEXT NOT NULL,
    contents BLOB NOT NULL DEFAULT x'',
    PRIMARY KEY (module_path, version, file_path),
    FOREIGN KEY (module_path, version) REFERENCES versions(module_path, version)
);

CREATE TABLE IF NOT EXISTS package_licenses (
    module_path TEXT NOT NULL,
    version TEXT NOT NULL,
    package_path TEXT NOT NULL,
    file_path TEXT NOT NULL,
    PRIMARY KEY (module_path, version, package_path, file_path),
    FOREIGN KEY (module_path, version, file_path)
        REFERENCES licenses(module_path, version, file_path)
);

CREATE TABLE IF NOT EXISTS imports (
    from_path TEXT NOT NULL,
    from_version TEXT NOT NULL,
    to_path TEXT NOT NULL,
    to_name TEXT NOT NULL,
    PRIMARY KEY (from_path, from_version, to_path)
);

CREATE INDEX IF NOT EXISTS idx_imports_to_path ON imports(to_path);

CREATE VIEW IF NOT EXISTS vw_licensed_packages AS
SELECT
    p.path,
    p.module_path,
    p.version,
    p.name,
    p.synopsis,
    p.suffix,
    p.documentation,
    json_group_array(l.type) FILTER (WHERE l.file_path IS NOT NULL) AS license_types,
    json_group_array(l.file_path) FILTER (WHERE l.file_path IS NOT NULL) AS license_paths
FROM
    packages p
LEFT JOIN
    package_licenses pl
ON
    pl.module_path = p.module_path
    AND pl.version = p.version
    AND pl.package_path = p.path
LEFT JOIN
    licenses l
ON
    l.module_path = pl.module_path
    AND l.version = pl.version
    AND l.file_path = pl.file_path
GROUP BY
    p.path,
    p.module_path,
    p.version;
"#;
