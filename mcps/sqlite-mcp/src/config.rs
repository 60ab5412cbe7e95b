//! Configuration for SQLite MCP Server

use std::path::{Path, PathBuf};
use std::time::Duration;

use mcp_common::LogFormat;
use serde::Deserialize;
use thiserror::Error;

use crate::store::MAX_BUSY_TIMEOUT;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SQLITE_MCP_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// SQLite MCP configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Database file settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, created empty if missing
    pub path: PathBuf,

    /// How long a statement waits on a locked database
    /// Default: 30
    pub busy_timeout_secs: u64,

    /// Seed the demonstration tables before serving
    pub create_sample: bool,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database.db"),
            busy_timeout_secs: 30,
            create_sample: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl ServerConfig {
    /// Load configuration
    ///
    /// Looks for config in:
    /// 1. `explicit` (the `--config` flag)
    /// 2. `SQLITE_MCP_CONFIG` environment variable
    /// 3. `~/.binks/sqlite.toml`
    /// 4. `./sqlite-mcp.toml`
    /// 5. `$XDG_CONFIG_HOME/sqlite-mcp/config.toml`
    ///
    /// An explicit file must exist and parse. Discovered files that fail to
    /// parse are skipped with a warning. With no file at all, defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        for path in Self::search_paths() {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!(error = %e, "Skipping config file"),
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Candidate locations searched when no file is named explicitly
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".binks").join("sqlite.toml"));
        }
        paths.push(PathBuf::from("sqlite-mcp.toml"));
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("sqlite-mcp").join("config.toml"));
        }
        paths
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Reject values the store cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_secs = MAX_BUSY_TIMEOUT.as_secs();
        if self.database.busy_timeout_secs > max_secs {
            return Err(ConfigError::Invalid(format!(
                "database.busy_timeout_secs = {} exceeds the maximum of {}",
                self.database.busy_timeout_secs, max_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.database.path, PathBuf::from("database.db"));
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(30));
        assert!(!config.database.create_sample);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_file() {
        let config: ServerConfig = toml::from_str(
            r#"
            [database]
            path = "/var/lib/app/data.db"
            busy_timeout_secs = 5
            create_sample = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/var/lib/app/data.db"));
        assert_eq!(config.database.busy_timeout_secs, 5);
        assert!(config.database.create_sample);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServerConfig = toml::from_str("[database]\npath = \"other.db\"\n").unwrap();
        assert_eq!(config.database.path, PathBuf::from("other.db"));
        assert_eq!(config.database.busy_timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\ncreate_sample = true\n").unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert!(config.database.create_sample);
    }

    #[test]
    fn test_explicit_file_errors() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("missing.toml");
        let err = ServerConfig::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[database\npath = ").unwrap();
        let err = ServerConfig::load(Some(&broken)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_busy_timeout_out_of_range_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\nbusy_timeout_secs = 3000000\n").unwrap();

        let err = ServerConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("busy_timeout_secs"));

        let mut config = ServerConfig::default();
        config.database.busy_timeout_secs = MAX_BUSY_TIMEOUT.as_secs();
        assert!(config.validate().is_ok());
    }
}
