//! Loading and saving the bufcache config file
//!
//! The file lives at `<config dir>/bufcache/config.toml` unless `--config`
//! names another one. A missing file is not an error: every setting has a
//! default, and the cache directory still honors `BUF_CACHE_DIR`.

pub mod schema;

pub use schema::{CacheConfig, Config, GeneralConfig, LogFormat, CACHE_DIR_ENV};

use crate::error::{CacheError, CacheResult};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Reads and writes one config file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Use the config file at `path` instead of the per-user one
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Per-user config file, or `./bufcache/config.toml` when the platform
    /// has no config directory
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("bufcache").join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Read the config file, or the defaults when it does not exist
    pub async fn load(&self) -> CacheResult<Config> {
        let path = &self.config_path;
        match fs::read_to_string(path).await {
            Ok(content) => parse(path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Config::default())
            }
            Err(e) => Err(CacheError::io(format!("reading config {}", path.display()), e)),
        }
    }

    /// Write `config` as TOML, creating the parent directory as needed
    pub async fn save(&self, config: &Config) -> CacheResult<()> {
        let path = &self.config_path;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::ConfigDirCreate {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(path, content)
            .await
            .map_err(|e| CacheError::io(format!("writing config {}", path.display()), e))?;

        info!("Wrote config to {}", path.display());
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(path: &Path, content: &str) -> CacheResult<Config> {
    toml::from_str(content).map_err(|e| CacheError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::FileVersion;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults_without_creating_it() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path.clone());

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.lock_file_version, FileVersion::V2);
        assert!(config.cache.dir.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nlock_file_version = \"v1\"\n").unwrap();

        let config = ConfigManager::with_path(path).load().await.unwrap();
        assert_eq!(config.cache.lock_file_version, FileVersion::V1);
        assert_eq!(config.general.log_format, LogFormat::default());
    }

    #[test]
    fn default_path_is_per_user_bufcache_file() {
        let path = ConfigManager::default_config_path();
        assert!(path.ends_with("bufcache/config.toml"));
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.dir = Some(temp.path().join("cache"));
        config.general.log_format = LogFormat::Json;

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.dir, Some(temp.path().join("cache")));
        assert_eq!(loaded.general.log_format, LogFormat::Json);
    }

    #[tokio::test]
    async fn invalid_file_is_reported_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache\n").unwrap();
        let manager = ConfigManager::with_path(path.clone());

        match manager.load().await {
            Err(CacheError::ConfigInvalid { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }
}
