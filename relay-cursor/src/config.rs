//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: RELAY_CURSOR_)
//! 2. Current working directory: ./pagination.toml
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::validate_column;

/// Default page size and safety bound
pub const DEFAULT_LIMIT: u64 = 50;

/// File name searched for in the working directory
pub const CONFIG_FILE: &str = "pagination.toml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "RELAY_CURSOR_";

/// Pagination settings threaded into every scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when a request gives neither `first` nor `last`
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Column holding the cursor key
    #[serde(default = "default_key_column")]
    pub key_column: String,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

fn default_key_column() -> String {
    "id".to_string()
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            key_column: default_key_column(),
        }
    }
}

impl PaginationConfig {
    /// Load configuration from defaults, `./pagination.toml` and the environment
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading pagination configuration from {}", CONFIG_FILE);
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment variables still apply.
    /// The key column must be a plain column name since it is spliced into SQL.
    pub fn load_from(path: &str) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        validate_column(&config.key_column)?;

        tracing::debug!(
            default_limit = config.default_limit,
            key_column = %config.key_column,
            "Pagination configuration loaded"
        );
        Ok(config)
    }
}
