//! Version resolution over a row source
//!
//! [`VersionResolver`] validates identifying input, runs the keyed read on
//! the blocking pool under the configured deadline, and turns rows into the
//! caller-facing structures. It holds no state besides the shared row source,
//! so it can be cloned freely and called concurrently.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::version::assembler::VersionAssembler;
use crate::version::error::StoreError;
use crate::version::license::{License, sort_licenses};
use crate::version::store::{CancelToken, RowSource};
use crate::version::types::{Import, Version, VersionInfo, VersionType, VersionedPackage};

pub struct VersionResolver<S: RowSource> {
    source: Arc<S>,
    query: QueryConfig,
}

impl<S: RowSource> Clone for VersionResolver<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            query: self.query.clone(),
        }
    }
}

fn require(values: &[(&str, &str)]) -> Result<(), StoreError> {
    let missing: Vec<&str> = values
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(StoreError::InvalidArgument(format!(
        "{} cannot be empty",
        missing.join(" and ")
    )))
}

impl<S: RowSource> VersionResolver<S> {
    pub fn new(source: Arc<S>, query: QueryConfig) -> Self {
        Self { source, query }
    }

    /// Run a blocking read with a deadline.
    ///
    /// The read observes a cancel token that is set when the deadline passes or
    /// when the returned future is dropped before completion.
    async fn run<T, F>(&self, operation: &'static str, read: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&S, &CancelToken) -> Result<T, StoreError> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let token = CancelToken::new();
        let _guard = token.cancel_on_drop();
        let read_token = token.clone();

        debug!(operation, "Running storage read");
        let task = tokio::task::spawn_blocking(move || read(&source, &read_token));

        match tokio::time::timeout(self.query.timeout(), task).await {
            Ok(joined) => joined?,
            Err(_) => {
                token.cancel();
                warn!(
                    operation,
                    timeout_ms = self.query.timeout_ms,
                    "Storage read exceeded deadline"
                );
                Err(StoreError::Cancelled(format!(
                    "{} exceeded {}ms deadline",
                    operation, self.query.timeout_ms
                )))
            }
        }
    }

    /// Package `path` at `version`
    pub async fn get_package(
        &self,
        path: &str,
        version: &str,
    ) -> Result<VersionedPackage, StoreError> {
        require(&[("path", path), ("version", version)])?;

        let (p, v) = (path.to_string(), version.to_string());
        let row = self
            .run("get_package", move |source, cancel| {
                source.package_row(cancel, &p, &v)
            })
            .await?;

        match row {
            Some(row) => row.into_versioned_package(),
            None => Err(StoreError::NotFound(format!(
                "package {}@{} not found",
                path, version
            ))),
        }
    }

    /// Package `path` from the greatest module path providing it, at that
    /// module's newest version
    pub async fn get_latest_package(&self, path: &str) -> Result<VersionedPackage, StoreError> {
        require(&[("path", path)])?;

        let p = path.to_string();
        let row = self
            .run("get_latest_package", move |source, cancel| {
                source.latest_package_row(cancel, &p)
            })
            .await?;

        match row {
            Some(row) => row.into_versioned_package(),
            None => Err(StoreError::NotFound(format!("package {} not found", path))),
        }
    }

    /// The module version containing `path` at `version`, with every package
    /// of that version in path order
    pub async fn get_version_for_package(
        &self,
        path: &str,
        version: &str,
    ) -> Result<Version, StoreError> {
        require(&[("path", path), ("version", version)])?;

        let (p, v) = (path.to_string(), version.to_string());
        let rows = self
            .run("get_version_for_package", move |source, cancel| {
                source.version_package_rows(cancel, &p, &v)
            })
            .await?;

        VersionAssembler::assemble(version, rows)
    }

    /// Tagged (release and prerelease) versions of the series of `path`,
    /// newest first
    pub async fn get_tagged_versions_for_package_series(
        &self,
        path: &str,
    ) -> Result<Vec<VersionInfo>, StoreError> {
        self.list_versions(path, &[VersionType::Release, VersionType::Prerelease])
            .await
    }

    /// The most recent pseudo-versions of the series of `path`, newest first
    pub async fn get_pseudo_versions_for_package_series(
        &self,
        path: &str,
    ) -> Result<Vec<VersionInfo>, StoreError> {
        self.list_versions(path, &[VersionType::Pseudo]).await
    }

    /// Versions of the series of `path` whose type is in `version_types`,
    /// newest first.
    ///
    /// A listing of pseudo-versions alone is cut to the configured limit.
    pub async fn list_versions(
        &self,
        path: &str,
        version_types: &[VersionType],
    ) -> Result<Vec<VersionInfo>, StoreError> {
        let types: Vec<VersionType> = version_types
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if types.is_empty() {
            return Err(StoreError::InvalidArgument(
                "must specify at least one version type".to_string(),
            ));
        }

        let limit = (types == [VersionType::Pseudo]).then_some(self.query.pseudo_version_limit);

        let p = path.to_string();
        let rows = self
            .run("list_versions", move |source, cancel| {
                source.series_versions(cancel, &p, &types, limit)
            })
            .await?;

        Ok(rows.into_iter().map(VersionInfo::from).collect())
    }

    /// Module version by module path and version
    pub async fn get_version(
        &self,
        module_path: &str,
        version: &str,
    ) -> Result<VersionInfo, StoreError> {
        require(&[("module path", module_path), ("version", version)])?;

        let (m, v) = (module_path.to_string(), version.to_string());
        let info = self
            .run("get_version", move |source, cancel| {
                source.version_info(cancel, &m, &v)
            })
            .await?;

        info.ok_or_else(|| {
            StoreError::NotFound(format!("module {}@{} not found", module_path, version))
        })
    }

    /// Packages imported by `path@version`
    pub async fn get_imports(&self, path: &str, version: &str) -> Result<Vec<Import>, StoreError> {
        require(&[("path", path), ("version", version)])?;

        let (p, v) = (path.to_string(), version.to_string());
        self.run("get_imports", move |source, cancel| {
            source.imports(cancel, &p, &v)
        })
        .await
    }

    /// Paths of packages importing `path`
    pub async fn get_imported_by(&self, path: &str) -> Result<Vec<String>, StoreError> {
        require(&[("path", path)])?;

        let p = path.to_string();
        self.run("get_imported_by", move |source, cancel| {
            source.imported_by(cancel, &p)
        })
        .await
    }

    /// License files of `path@version` with their contents, deepest first
    pub async fn get_licenses(&self, path: &str, version: &str) -> Result<Vec<License>, StoreError> {
        require(&[("path", path), ("version", version)])?;

        let (p, v) = (path.to_string(), version.to_string());
        let mut licenses = self
            .run("get_licenses", move |source, cancel| {
                source.licenses(cancel, &p, &v)
            })
            .await?;

        sort_licenses(&mut licenses);
        Ok(licenses)
    }
}
