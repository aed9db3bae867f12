//! Runtime configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                     | Default           |
//! |------------------------------|-------------------|
//! | `NUTRIBASE_DATABASE`         | `./nutribase.db`  |
//! | `NUTRIBASE_MAX_CONNECTIONS`  | `5`               |
//! | `NUTRIBASE_AGGREGATION`      | `joined`          |
//! | `NUTRIBASE_RUN_MIGRATIONS`   | `true`            |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;
use crate::repository::aggregate::AggregationStrategy;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file, or `:memory:`
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Read strategy for listing documents
    pub aggregation: AggregationStrategy,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig {
            database_path: lookup("NUTRIBASE_DATABASE")
                .unwrap_or_else(|| "./nutribase.db".to_string())
                .into(),

            max_connections: lookup("NUTRIBASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NUTRIBASE_MAX_CONNECTIONS".to_string()))?,

            aggregation: match lookup("NUTRIBASE_AGGREGATION") {
                Some(value) => value.parse()?,
                None => AggregationStrategy::default(),
            },

            run_migrations: lookup("NUTRIBASE_RUN_MIGRATIONS")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NUTRIBASE_RUN_MIGRATIONS".to_string()))?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "NUTRIBASE_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Builds the pool configuration.
    ///
    /// An in-memory database is pinned to one connection whatever
    /// `max_connections` says.
    pub fn db_config(&self) -> DbConfig {
        let base = if self.database_path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
        };

        base.aggregation(self.aggregation)
            .run_migrations(self.run_migrations)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Unknown aggregation strategy '{0}' (expected 'joined' or 'fan_out')")]
    UnknownStrategy(String),
}
