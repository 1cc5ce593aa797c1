//! Sync configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_LIST_URL: &str = "https://easylist.to/easylist/easylist.txt";
pub const DEFAULT_CACHE_NAME: &str = "easylist_cached.txt";
pub const DEFAULT_TTL_SECS: u64 = 60 * 60 * 24;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Which HTTP client performs fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Async reqwest client
    Async,
    /// Blocking reqwest client on the blocking pool
    Blocking,
    /// Async first, blocking if that fails
    #[default]
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub list_url: String,
    pub cache_path: PathBuf,
    pub ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub transport: TransportKind,
    pub use_system_proxy: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            list_url: DEFAULT_LIST_URL.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_NAME),
            ttl_secs: DEFAULT_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            transport: TransportKind::default(),
            use_system_proxy: true,
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list_url.trim().is_empty() {
            return Err(ConfigError::Invalid("list_url must not be empty".to_string()));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("cache_path must not be empty".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be positive".to_string()));
        }
        if self.check_interval_secs == 0 {
            return Err(ConfigError::Invalid("check_interval_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}
