//! Engine configuration.
//!
//! ```json
//! {
//!   "api_level": 31,
//!   "registry_dir": "/data/local/tmp/binderdb",
//!   "use_builtin_tables": true,
//!   "bind_timeout_ms": 5000,
//!   "text_mode": "string16"
//! }
//! ```
//!
//! Only `api_level` is required. `PTX_API_LEVEL` in the environment
//! overrides it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::locator::DEFAULT_BIND_TIMEOUT;
use crate::parcel::TextMode;
use crate::registry::ApiLevel;

/// Environment variable overriding `api_level`
pub const API_LEVEL_ENV: &str = "PTX_API_LEVEL";

/// Oldest level with a header layout this crate can write
const MIN_API_LEVEL: u32 = ApiLevel::P.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactConfig {
    /// Platform version to select a table for
    pub api_level: ApiLevel,
    /// Directory of `binderdb-<level>.json` tables; overrides built-ins per level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub use_builtin_tables: bool,
    #[serde(default = "default_bind_timeout_ms")]
    pub bind_timeout_ms: u64,
    #[serde(default)]
    pub text_mode: TextMode,
}

fn default_true() -> bool {
    true
}

fn default_bind_timeout_ms() -> u64 {
    DEFAULT_BIND_TIMEOUT.as_millis() as u64
}

impl TransactConfig {
    /// Configuration for `level` with built-in tables and default timeouts
    pub fn for_level(level: ApiLevel) -> Self {
        Self {
            api_level: level,
            registry_dir: None,
            use_builtin_tables: true,
            bind_timeout_ms: default_bind_timeout_ms(),
            text_mode: TextMode::default(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Apply `PTX_API_LEVEL` from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let value = std::env::var(API_LEVEL_ENV).ok();
        self.with_api_level_override(value.as_deref())
    }

    /// Apply an API level override given as text, e.g. from the environment
    pub fn with_api_level_override(mut self, value: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(value) = value {
            let level: u32 = value.trim().parse().map_err(|_| {
                ConfigError::invalid("api_level", format!("'{}' is not an API level", value))
            })?;
            self.api_level = ApiLevel(level);
            self.validate()?;
        }
        Ok(self)
    }

    /// Check field values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_level.get() < MIN_API_LEVEL {
            return Err(ConfigError::invalid(
                "api_level",
                format!("{} is older than the oldest supported level {}", self.api_level, MIN_API_LEVEL),
            ));
        }
        if self.bind_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "bind_timeout_ms",
                "must be greater than zero",
            ));
        }
        if !self.use_builtin_tables && self.registry_dir.is_none() {
            return Err(ConfigError::invalid(
                "registry_dir",
                "required when use_builtin_tables is false",
            ));
        }
        Ok(())
    }

    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }
}
