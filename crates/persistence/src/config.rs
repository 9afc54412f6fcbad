//! Store configuration.
//!
//! Supports programmatic construction, command line arguments and
//! environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLINICAL_STORE_DATABASE` | clinical.db | SQLite file path, or `:memory:` |
//! | `CLINICAL_STORE_LOG_LEVEL` | info | Log level |
//! | `CLINICAL_STORE_BASE_URL` | http://localhost:8080 | Base URL for search links |
//! | `CLINICAL_STORE_MAX_CONNECTIONS` | 10 | Pool size for file databases |
//! | `CLINICAL_STORE_BUSY_TIMEOUT_MS` | 5000 | SQLite busy timeout |
//! | `CLINICAL_STORE_SEARCH_TIMEOUT_MS` | 30000 | Search deadline |
//!
//! # Example
//!
//! ```rust
//! use clinical_persistence::StoreConfig;
//!
//! let config = StoreConfig {
//!     database: ":memory:".to_string(),
//!     search_timeout_ms: 5_000,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;
use url::Url;

/// Configuration for a clinical store instance.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "clinical-store")]
#[command(about = "Clinical resource store administration")]
pub struct StoreConfig {
    /// SQLite database path, or `:memory:`.
    #[arg(long, env = "CLINICAL_STORE_DATABASE", default_value = "clinical.db")]
    pub database: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CLINICAL_STORE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Base URL used in search bundle links and entry URLs.
    #[arg(long, env = "CLINICAL_STORE_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Maximum pooled connections (file databases only).
    #[arg(long, env = "CLINICAL_STORE_MAX_CONNECTIONS", default_value = "10")]
    pub max_connections: u32,

    /// SQLite busy timeout in milliseconds.
    #[arg(long, env = "CLINICAL_STORE_BUSY_TIMEOUT_MS", default_value = "5000")]
    pub busy_timeout_ms: u32,

    /// Search deadline in milliseconds.
    #[arg(long, env = "CLINICAL_STORE_SEARCH_TIMEOUT_MS", default_value = "30000")]
    pub search_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: "clinical.db".to_string(),
            log_level: "info".to_string(),
            base_url: "http://localhost:8080".to_string(),
            max_connections: 10,
            busy_timeout_ms: 5000,
            search_timeout_ms: 30_000,
        }
    }
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl StoreConfig {
    /// Returns `true` when the database lives in memory.
    pub fn is_memory(&self) -> bool {
        self.database == ":memory:"
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.query().is_some() || url.fragment().is_some() {
                    errors.push("Base URL cannot carry a query or fragment".to_string());
                }
            }
            Ok(url) => errors.push(format!("Base URL scheme '{}' is not http(s)", url.scheme())),
            Err(e) => errors.push(format!("Invalid base URL '{}': {}", self.base_url, e)),
        }

        if self.max_connections == 0 {
            errors.push("Max connections cannot be 0".to_string());
        }

        if self.search_timeout_ms == 0 {
            errors.push("Search timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing: in-memory, short timeouts.
    pub fn for_testing() -> Self {
        Self {
            database: ":memory:".to_string(),
            log_level: "debug".to_string(),
            base_url: "http://localhost:0".to_string(),
            max_connections: 1,
            busy_timeout_ms: 1000,
            search_timeout_ms: 5000,
        }
    }

    /// Backend settings derived from this configuration.
    #[cfg(feature = "sqlite")]
    pub fn to_backend_config(&self) -> crate::backends::sqlite::SqliteBackendConfig {
        crate::backends::sqlite::SqliteBackendConfig {
            max_connections: self.max_connections,
            busy_timeout_ms: self.busy_timeout_ms,
            search_timeout_ms: self.search_timeout_ms,
            ..Default::default()
        }
    }

    /// Opens the configured database and creates the schema if needed.
    #[cfg(feature = "sqlite")]
    pub fn open_backend(&self) -> crate::StorageResult<crate::backends::sqlite::SqliteBackend> {
        let backend =
            crate::backends::sqlite::SqliteBackend::with_config(&self.database, self.to_backend_config())?;
        backend.init_schema()?;
        Ok(backend)
    }
}
