//! Demo configuration loading from file and environment variables.

use relmap_db::DbRuntimeSettings;
use serde::Deserialize;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. Required.
    #[serde(default)]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Deadline for checking a connection out of the pool, in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "relmap_store=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Statements slower than this many milliseconds are logged at `warn`.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    DbRuntimeSettings::default().pool_max_size
}

fn default_connection_timeout_ms() -> u64 {
    DbRuntimeSettings::default().connection_timeout_ms
}

fn default_slow_query_ms() -> u64 {
    DbRuntimeSettings::default().slow_query_ms
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            slow_query_ms: default_slow_query_ms(),
        }
    }
}

impl Config {
    /// Pool settings, including the slow-query threshold from `[logging]`.
    pub fn db_runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.database.busy_timeout_ms,
            pool_max_size: self.database.pool_max_size,
            connection_timeout_ms: self.database.connection_timeout_ms,
            slow_query_ms: self.logging.slow_query_ms,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Neither the file nor the environment named a database.
    #[error("database.path is not set (config file or RELMAP_DB_PATH)")]
    MissingDatabasePath,

    /// The pool size must allow at least one connection.
    #[error("database.pool_max_size must be at least 1")]
    InvalidPoolSize,
}

/// Loads configuration from a TOML file, then applies environment overrides.
///
/// Environment variable overrides:
/// - `RELMAP_DB_PATH` overrides `database.path`
/// - `RELMAP_DB_POOL_MAX_SIZE` overrides `database.pool_max_size`
/// - `RELMAP_LOG_LEVEL` overrides `logging.level`
/// - `RELMAP_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `RELMAP_LOG_SLOW_QUERY_MS` overrides `logging.slow_query_ms`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the resulting configuration has no database path.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(db_path) = var("RELMAP_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(size) = var("RELMAP_DB_POOL_MAX_SIZE") {
        if let Ok(parsed) = size.parse() {
            config.database.pool_max_size = parsed;
        }
    }
    if let Some(level) = var("RELMAP_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("RELMAP_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(ms) = var("RELMAP_LOG_SLOW_QUERY_MS") {
        if let Ok(parsed) = ms.parse() {
            config.logging.slow_query_ms = parsed;
        }
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::MissingDatabasePath);
    }
    if config.database.pool_max_size == 0 {
        return Err(ConfigError::InvalidPoolSize);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml_text: &str) -> Config {
        toml::from_str(toml_text).expect("config should parse")
    }

    #[test]
    fn file_values_and_defaults() {
        let config = parse(
            r#"
            [database]
            path = "demo.db"
            pool_max_size = 2

            [logging]
            json = true
            slow_query_ms = 200
            "#,
        );

        assert_eq!(config.database.path, "demo.db");
        assert_eq!(config.database.pool_max_size, 2);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);
        assert!(validate(&config).is_ok());

        let settings = config.db_runtime_settings();
        assert_eq!(settings.pool_max_size, 2);
        assert_eq!(settings.slow_query_ms, 200);
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = parse("[database]\npath = \"file.db\"\n");
        let env: HashMap<&str, &str> = [
            ("RELMAP_DB_PATH", "env.db"),
            ("RELMAP_DB_POOL_MAX_SIZE", "3"),
            ("RELMAP_LOG_LEVEL", "debug"),
            ("RELMAP_LOG_JSON", "1"),
            ("RELMAP_LOG_SLOW_QUERY_MS", "50"),
        ]
        .into_iter()
        .collect();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, "env.db");
        assert_eq!(config.database.pool_max_size, 3);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.logging.slow_query_ms, 50);
    }

    #[test]
    fn unparsable_pool_size_is_ignored() {
        let mut config = parse("[database]\npath = \"file.db\"\n");
        apply_env_overrides(&mut config, |key| {
            (key == "RELMAP_DB_POOL_MAX_SIZE").then(|| "many".to_string())
        });
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.logging.slow_query_ms, 1_000);
    }

    #[test]
    fn missing_database_path_is_fatal() {
        let config = Config::default();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingDatabasePath)
        ));

        let blank = parse("[database]\npath = \"   \"\n");
        assert!(matches!(
            validate(&blank),
            Err(ConfigError::MissingDatabasePath)
        ));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let config = parse("[database]\npath = \"a.db\"\npool_max_size = 0\n");
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPoolSize)));
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("relmap.toml");
        std::fs::write(&path, "[database]\npath = \"from-file.db\"\n").expect("write config");

        let config = load_config(path.to_str()).expect("config should load");
        // RELMAP_DB_PATH may be set in the environment running the tests.
        if std::env::var("RELMAP_DB_PATH").is_err() {
            assert_eq!(config.database.path, "from-file.db");
        }
    }

    #[test]
    fn load_config_rejects_malformed_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("relmap.toml");
        std::fs::write(&path, "[database\npath = ").expect("write config");

        let err = load_config(path.to_str()).expect_err("malformed toml");
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
    }
}
