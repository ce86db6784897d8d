use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Value, ValueRef};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Row, params_from_iter};
use tracing::{debug, info};

use crate::version::error::StoreError;
use crate::version::license::{License, LicenseMetadata};
use crate::version::store::{CancelToken, PackageRow, RowSource, SeriesVersionRow};
use crate::version::types::{Import, VersionInfo, VersionType};

/// SQLite virtual machine instructions between cancellation checks
const PROGRESS_CHECK_OPS: i32 = 1_000;

/// Columns read by every package query, in [`package_row_from`] order
const PACKAGE_SELECT: &str = r#"
    SELECT
        p.path,
        m.series_path,
        p.module_path,
        p.version,
        p.name,
        p.synopsis,
        p.suffix,
        p.license_types,
        p.license_paths,
        v.readme_file_path,
        v.readme_contents,
        v.commit_time,
        v.version_type,
        p.documentation
    FROM
        vw_licensed_packages p
    INNER JOIN
        versions v
    ON
        v.module_path = p.module_path
        AND v.version = p.version
    INNER JOIN
        modules m
    ON
        m.path = v.module_path
"#;

impl FromSql for VersionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<VersionType>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// JSON array of strings stored in a TEXT column
struct JsonStrings(Vec<String>);

impl FromSql for JsonStrings {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        serde_json::from_str(value.as_str()?)
            .map(JsonStrings)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn package_row_from(row: &Row<'_>) -> rusqlite::Result<PackageRow> {
    Ok(PackageRow {
        path: row.get(0)?,
        series_path: row.get(1)?,
        module_path: row.get(2)?,
        version: row.get(3)?,
        name: row.get(4)?,
        synopsis: row.get(5)?,
        suffix: row.get(6)?,
        license_types: row.get::<_, JsonStrings>(7)?.0,
        license_paths: row.get::<_, JsonStrings>(8)?.0,
        readme_file_path: row.get(9)?,
        readme_contents: row.get(10)?,
        commit_time: row.get(11)?,
        version_type: row.get(12)?,
        documentation: row.get(13)?,
    })
}

fn is_interrupted(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted
    )
}

/// Read-only registry database
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open an existing registry database for reading
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening registry database at {:?}", db_path);

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;

        Self::from_connection(conn)
    }

    /// Wrap an already opened connection. Further writes through it are refused.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "query_only", true)?;
        debug!("Database connection established");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Run `read` on the connection while `cancel` can abort it.
    ///
    /// Statements started by `read` must be drained before it returns; the
    /// connection lock is released right after.
    fn read<T, F>(&self, cancel: &CancelToken, read: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        cancel.check()?;
        let conn = self.lock_conn()?;

        let token = cancel.clone();
        conn.progress_handler(PROGRESS_CHECK_OPS, Some(move || token.is_cancelled()));
        let result = read(&conn);
        conn.progress_handler(0, None::<fn() -> bool>);

        result.map_err(|e| {
            if is_interrupted(&e) {
                debug!("Statement interrupted by cancellation");
                StoreError::Cancelled("statement interrupted".to_string())
            } else {
                StoreError::Database(e)
            }
        })
    }
}

impl RowSource for Database {
    fn package_row(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Option<PackageRow>, StoreError> {
        let query = format!(
            "{PACKAGE_SELECT}
            WHERE
                p.path = ?1
                AND p.version = ?2
            ORDER BY
                p.module_path
            LIMIT 1"
        );

        self.read(cancel, |conn| {
            conn.query_row(&query, (path, version), package_row_from)
                .optional()
        })
    }

    fn latest_package_row(
        &self,
        cancel: &CancelToken,
        path: &str,
    ) -> Result<Option<PackageRow>, StoreError> {
        let query = format!(
            "{PACKAGE_SELECT}
            WHERE
                p.path = ?1
            ORDER BY
                v.module_path DESC,
                v.major DESC,
                v.minor DESC,
                v.patch DESC,
                v.prerelease DESC,
                v.version DESC
            LIMIT 1"
        );

        self.read(cancel, |conn| {
            conn.query_row(&query, [path], package_row_from).optional()
        })
    }

    fn version_package_rows(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<PackageRow>, StoreError> {
        let query = format!(
            "{PACKAGE_SELECT}
            WHERE
                p.version = ?1
                AND p.module_path IN (
                    SELECT module_path
                    FROM packages
                    WHERE path = ?2
                )
            ORDER BY
                p.path,
                p.module_path"
        );

        self.read(cancel, |conn| {
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt
                .query_map((version, path), package_row_from)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn series_versions(
        &self,
        cancel: &CancelToken,
        path: &str,
        version_types: &[VersionType],
        limit: Option<usize>,
    ) -> Result<Vec<SeriesVersionRow>, StoreError> {
        // my.mod/foo is history for my.mod/v2/foo: every package of the series
        // with the same suffix is matched.
        let type_placeholders = (0..version_types.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let limit_placeholder = version_types.len() + 2;
        let query = format!(
            r#"
            WITH package_series AS (
                SELECT
                    m.series_path,
                    p.path AS package_path,
                    p.suffix AS package_suffix,
                    p.module_path,
                    v.version,
                    v.commit_time,
                    p.synopsis,
                    v.major,
                    v.minor,
                    v.patch,
                    v.prerelease,
                    v.version_type
                FROM
                    modules m
                INNER JOIN
                    packages p
                ON
                    p.module_path = m.path
                INNER JOIN
                    versions v
                ON
                    p.module_path = v.module_path
                    AND p.version = v.version
            )
            SELECT
                series_path,
                module_path,
                version,
                version_type,
                commit_time,
                synopsis
            FROM
                package_series
            WHERE
                (series_path, package_suffix) IN (
                    SELECT series_path, package_suffix
                    FROM package_series
                    WHERE package_path = ?1
                )
                AND version_type IN ({type_placeholders})
            ORDER BY
                major DESC,
                minor DESC,
                patch DESC,
                prerelease DESC,
                module_path DESC,
                version DESC
            LIMIT ?{limit_placeholder}"#
        );

        // LIMIT -1 is unbounded in SQLite
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let params: Vec<Value> = std::iter::once(Value::Text(path.to_string()))
            .chain(
                version_types
                    .iter()
                    .map(|t| Value::Text(t.as_str().to_string())),
            )
            .chain(std::iter::once(Value::Integer(limit)))
            .collect();

        debug!(path, ?version_types, limit, "Listing series versions");

        self.read(cancel, |conn| {
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok(SeriesVersionRow {
                        series_path: row.get(0)?,
                        module_path: row.get(1)?,
                        version: row.get(2)?,
                        version_type: row.get(3)?,
                        commit_time: row.get(4)?,
                        synopsis: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn version_info(
        &self,
        cancel: &CancelToken,
        module_path: &str,
        version: &str,
    ) -> Result<Option<VersionInfo>, StoreError> {
        self.read(cancel, |conn| {
            conn.query_row(
                r#"
                SELECT
                    v.commit_time,
                    v.readme_file_path,
                    v.readme_contents,
                    v.version_type
                FROM
                    versions v
                INNER JOIN
                    modules m
                ON
                    m.path = v.module_path
                WHERE
                    v.module_path = ?1
                    AND v.version = ?2
                "#,
                (module_path, version),
                |row| {
                    Ok(VersionInfo {
                        module_path: module_path.to_string(),
                        version: version.to_string(),
                        commit_time: row.get(0)?,
                        readme_file_path: row.get(1)?,
                        readme_contents: row.get(2)?,
                        version_type: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    fn imports(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<Import>, StoreError> {
        self.read(cancel, |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT to_path, to_name FROM imports
                WHERE from_path = ?1 AND from_version = ?2
                ORDER BY to_path, to_name
                "#,
            )?;
            let imports = stmt
                .query_map((path, version), |row| {
                    Ok(Import {
                        path: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(imports)
        })
    }

    fn imported_by(&self, cancel: &CancelToken, path: &str) -> Result<Vec<String>, StoreError> {
        self.read(cancel, |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT from_path FROM imports WHERE to_path = ?1 ORDER BY from_path",
            )?;
            let paths = stmt
                .query_map([path], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(paths)
        })
    }

    fn licenses(
        &self,
        cancel: &CancelToken,
        path: &str,
        version: &str,
    ) -> Result<Vec<License>, StoreError> {
        self.read(cancel, |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT
                    l.type,
                    l.file_path,
                    l.contents
                FROM
                    licenses l
                INNER JOIN
                    package_licenses pl
                ON
                    pl.module_path = l.module_path
                    AND pl.version = l.version
                    AND pl.file_path = l.file_path
                INNER JOIN
                    packages p
                ON
                    p.module_path = pl.module_path
                    AND p.version = pl.version
                    AND p.path = pl.package_path
                WHERE
                    p.path = ?1
                    AND p.version = ?2
                ORDER BY l.file_path
                "#,
            )?;
            let licenses = stmt
                .query_map((path, version), |row| {
                    Ok(License {
                        metadata: LicenseMetadata {
                            license_type: row.get(0)?,
                            file_path: row.get(1)?,
                        },
                        contents: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(licenses)
        })
    }
}
