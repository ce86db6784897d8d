//! Builds the same registry contents in a SQLite file and in a MemoryStore

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;
use tempfile::TempDir;

use module_index::config::QueryConfig;
use module_index::storage::memory::MemoryStore;
use module_index::storage::schema::SCHEMA;
use module_index::storage::sqlite::Database;
use module_index::version::license::{License, LicenseMetadata};
use module_index::version::resolver::VersionResolver;
use module_index::version::semver::VersionKey;
use module_index::version::series::series_path;
use module_index::version::types::{Import, Package, VersionInfo};

/// Package path of `suffix` within `module_path`
pub fn package_path(module_path: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        module_path.to_string()
    } else {
        format!("{}/{}", module_path, suffix)
    }
}

/// Registry contents written to both row source implementations
pub struct RegistryFixture {
    temp_dir: TempDir,
    conn: Connection,
    memory: MemoryStore,
    packages: HashMap<(String, String, String), Package>,
    next_commit: DateTime<Utc>,
}

impl RegistryFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let conn = Connection::open(temp_dir.path().join("registry.db")).unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        Self {
            temp_dir,
            conn,
            memory: MemoryStore::new(),
            packages: HashMap::new(),
            next_commit: Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("registry.db")
    }

    /// Add a module version; each call gets a later commit time
    pub fn version(&mut self, module_path: &str, version: &str) -> &mut Self {
        let mut info = VersionInfo::new(module_path, version, self.next_commit)
            .unwrap_or_else(|| panic!("invalid fixture version {}", version));
        info.readme_file_path = "README.md".to_string();
        info.readme_contents = format!("# {}@{}", module_path, version).into_bytes();
        self.next_commit += Duration::hours(1);

        let key = VersionKey::parse(version).unwrap();
        self.conn
            .execute(
                "INSERT OR IGNORE INTO modules (path, series_path) VALUES (?1, ?2)",
                (module_path, series_path(module_path)),
            )
            .unwrap();
        self.conn
            .execute(
                r#"
                INSERT INTO versions
                    (module_path, version, major, minor, patch, prerelease, version_type,
                     commit_time, readme_file_path, readme_contents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                (
                    module_path,
                    version,
                    key.major as i64,
                    key.minor as i64,
                    key.patch as i64,
                    key.stored_prerelease(),
                    info.version_type.as_str(),
                    info.commit_time,
                    &info.readme_file_path,
                    &info.readme_contents,
                ),
            )
            .unwrap();

        self.memory.insert_version(info).unwrap();
        self
    }

    /// Add a package with `suffix` to an existing module version
    pub fn package(&mut self, module_path: &str, version: &str, suffix: &str) -> &mut Self {
        let path = package_path(module_path, suffix);
        let package = Package {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            synopsis: format!("Package {} does things.", path),
            path,
            suffix: suffix.to_string(),
            licenses: Vec::new(),
            documentation: b"<p>docs</p>".to_vec(),
        };

        self.conn
            .execute(
                r#"
                INSERT INTO packages
                    (path, module_path, version, name, synopsis, suffix, documentation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                (
                    &package.path,
                    module_path,
                    version,
                    &package.name,
                    &package.synopsis,
                    &package.suffix,
                    &package.documentation,
                ),
            )
            .unwrap();

        self.memory
            .insert_package(module_path, version, package.clone())
            .unwrap();
        self.packages.insert(
            (
                package.path.clone(),
                module_path.to_string(),
                version.to_string(),
            ),
            package,
        );
        self
    }

    /// Add a license file to a module version and apply it to the package
    /// with `suffix`
    pub fn license(
        &mut self,
        module_path: &str,
        version: &str,
        suffix: &str,
        license_type: &str,
        file_path: &str,
    ) -> &mut Self {
        let path = package_path(module_path, suffix);
        let contents = format!("{} license text", license_type).into_bytes();

        self.conn
            .execute(
                r#"
                INSERT OR IGNORE INTO licenses (module_path, version, file_path, type, contents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                (module_path, version, file_path, license_type, &contents),
            )
            .unwrap();
        self.conn
            .execute(
                r#"
                INSERT INTO package_licenses (module_path, version, package_path, file_path)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                (module_path, version, &path, file_path),
            )
            .unwrap();

        self.memory
            .insert_license(
                module_path,
                version,
                License {
                    metadata: LicenseMetadata::new(license_type, file_path),
                    contents,
                },
            )
            .unwrap();
        let package = self
            .packages
            .get_mut(&(path, module_path.to_string(), version.to_string()))
            .expect("license added to unknown package");
        package
            .licenses
            .push(LicenseMetadata::new(license_type, file_path));
        self.memory
            .insert_package(module_path, version, package.clone())
            .unwrap();
        self
    }

    /// Record that `from_path@from_version` imports `to_path`
    pub fn import(&mut self, from_path: &str, from_version: &str, to_path: &str) -> &mut Self {
        let name = to_path.rsplit('/').next().unwrap_or_default();

        self.conn
            .execute(
                r#"
                INSERT INTO imports (from_path, from_version, to_path, to_name)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                (from_path, from_version, to_path, name),
            )
            .unwrap();

        self.memory
            .insert_import(
                from_path,
                from_version,
                Import {
                    path: to_path.to_string(),
                    name: name.to_string(),
                },
            )
            .unwrap();
        self
    }

    /// Open the SQLite file read-only, keeping the directory alive
    pub fn into_sources(self) -> Sources {
        drop(self.conn);
        let database = Database::open(&self.temp_dir.path().join("registry.db")).unwrap();

        Sources {
            _temp_dir: self.temp_dir,
            database: Arc::new(database),
            memory: Arc::new(self.memory),
        }
    }
}

/// Both row sources built from one fixture
pub struct Sources {
    _temp_dir: TempDir,
    pub database: Arc<Database>,
    pub memory: Arc<MemoryStore>,
}

impl Sources {
    pub fn sqlite_resolver(&self) -> VersionResolver<Database> {
        VersionResolver::new(Arc::clone(&self.database), QueryConfig::default())
    }

    pub fn memory_resolver(&self) -> VersionResolver<MemoryStore> {
        VersionResolver::new(Arc::clone(&self.memory), QueryConfig::default())
    }
}
