//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LogFormat};
use crate::error::{CacheError, CacheResult};
use crate::lockfile::FileVersion;
use console::style;
use std::path::PathBuf;

/// Valid keys for `config set`
const CONFIG_KEYS: [&str; 3] = ["general.log_format", "cache.dir", "cache.lock_file_version"];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> CacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> CacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    match config.module_cache_dir() {
        Ok(dir) => println!("# module cache: {}", dir.display()),
        Err(e) => println!("# module cache: {}", e),
    }
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> CacheResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        println!(
            "{} Config already exists at {}",
            style("!").yellow(),
            path.display()
        );
        println!("  {}", style("Use --force to overwrite").dim());
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    println!(
        "{} Configuration initialized at {}",
        style("✓").green(),
        path.display()
    );

    Ok(())
}

async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> CacheResult<()> {
    // Start from the file, not the effective config, so CLI overrides are not persisted
    let mut config = manager.load().await?;
    apply_value(&mut config, key, value)?;

    manager.save(&config).await?;
    println!("{} Set {} = {}", style("✓").green(), key, value);

    Ok(())
}

/// Set a dot-separated key on `config`
fn apply_value(config: &mut Config, key: &str, value: &str) -> CacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["cache", "dir"] => {
            config.cache.dir = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }
        ["cache", "lock_file_version"] => {
            config.cache.lock_file_version = value.parse::<FileVersion>()?
        }
        _ => {
            return Err(CacheError::User(format!(
                "Unknown config key: {} (valid keys: {})",
                key,
                CONFIG_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

fn parse_log_format(value: &str) -> CacheResult<LogFormat> {
    match value.to_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(CacheError::User(format!(
            "Invalid log format: {}. Use text/json",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn apply_known_keys() {
        let mut config = Config::default();
        apply_value(&mut config, "general.log_format", "JSON").unwrap();
        apply_value(&mut config, "cache.dir", "/var/cache/buf").unwrap();
        apply_value(&mut config, "cache.lock_file_version", "v1").unwrap();

        assert_eq!(config.general.log_format, LogFormat::Json);
        assert_eq!(config.cache.dir, Some(PathBuf::from("/var/cache/buf")));
        assert_eq!(config.cache.lock_file_version, FileVersion::V1);

        apply_value(&mut config, "cache.dir", "").unwrap();
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let err = apply_value(&mut Config::default(), "vm.name", "x").unwrap_err();
        assert!(err.to_string().contains("cache.lock_file_version"));
    }

    #[test]
    fn apply_rejects_bad_values() {
        assert!(apply_value(&mut Config::default(), "general.log_format", "xml").is_err());
        assert!(apply_value(&mut Config::default(), "cache.lock_file_version", "v3").is_err());
    }

    #[tokio::test]
    async fn set_persists_to_file() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        set_value(&manager, "cache.lock_file_version", "v1")
            .await
            .unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.cache.lock_file_version, FileVersion::V1);
    }
}
