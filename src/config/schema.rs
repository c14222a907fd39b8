//! Configuration schema for bufcache
//!
//! Configuration is stored at `~/.config/bufcache/config.toml`

use crate::error::{CacheError, CacheResult};
use crate::lockfile::FileVersion;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Environment variable overriding the platform cache directory
pub const CACHE_DIR_ENV: &str = "BUF_CACHE_DIR";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

impl Config {
    /// Root cache directory
    ///
    /// `cache.dir` if set, else `$BUF_CACHE_DIR`, else `<platform cache dir>/buf`.
    pub fn cache_dir(&self) -> CacheResult<PathBuf> {
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }
        if let Some(dir) = env::var_os(CACHE_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::cache_dir()
            .map(|d| d.join("buf"))
            .ok_or(CacheError::CacheDirUnknown)
    }

    /// Directory holding module cache entries
    pub fn module_cache_dir(&self) -> CacheResult<PathBuf> {
        Ok(self.cache_dir()?.join("v3").join("modules"))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: LogFormat,
}

/// Cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root cache directory (default: platform cache dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Lock file version written for new entries
    pub lock_file_version: FileVersion,
}
