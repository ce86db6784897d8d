use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Query-related constants
// =============================================================================

/// Timeout for a single storage read in milliseconds (30 seconds)
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// Number of pseudo-versions listed for a package series
pub const DEFAULT_PSEUDO_VERSION_LIMIT: usize = 10;

/// Default log filter when neither the config nor RUST_LOG set one
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub log: LogConfig,
}

/// Storage location
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// SQLite database file, defaults to [`db_path`]
    pub path: Option<PathBuf>,
}

/// Query limits
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryConfig {
    pub timeout_ms: u64,
    pub pseudo_version_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            pseudo_version_limit: DEFAULT_PSEUDO_VERSION_LIMIT,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    pub level: String,
    /// Log file, defaults to [`log_path`]
    pub file: Option<PathBuf>,
    /// Write one JSON object per line instead of plain text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(db_path)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log.file.clone().unwrap_or_else(log_path)
    }
}

/// Returns the path to the data directory for module-index.
/// Uses $XDG_DATA_HOME/module-index if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/module-index,
/// or ./module-index if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("registry.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("module-index.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("module-index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<Config>(json!({
            "query": {
                "timeoutMs": 1000
            }
        }))
        .unwrap();

        assert_eq!(result.query.timeout_ms, 1000);
        assert_eq!(
            result.query.pseudo_version_limit,
            DEFAULT_PSEUDO_VERSION_LIMIT
        );
        assert_eq!(result.database, DatabaseConfig::default());
        assert_eq!(result.log, LogConfig::default());
    }

    #[test]
    fn config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<Config>(json!({
            "database": { "path": "/var/lib/registry.db" },
            "query": { "timeoutMs": 5000, "pseudoVersionLimit": 3 },
            "log": { "level": "debug", "file": "/tmp/module-index.log", "json": true }
        }))
        .unwrap();

        assert_eq!(
            result,
            Config {
                database: DatabaseConfig {
                    path: Some(PathBuf::from("/var/lib/registry.db")),
                },
                query: QueryConfig {
                    timeout_ms: 5000,
                    pseudo_version_limit: 3,
                },
                log: LogConfig {
                    level: "debug".to_string(),
                    file: Some(PathBuf::from("/tmp/module-index.log")),
                    json: true,
                },
            }
        );
        assert_eq!(result.db_path(), PathBuf::from("/var/lib/registry.db"));
        assert_eq!(result.query.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn load_returns_default_for_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let config = Config::load(&temp_dir.path().join("missing.json")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reports_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = Config::load(&path);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/module-index"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/module-index"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./module-index"));
    }
}
