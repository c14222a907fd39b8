//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bufcache - Inspect the buf module cache
///
/// Lists, shows and verifies content-addressed module cache entries.
#[derive(Parser, Debug)]
#[command(name = "bufcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BUFCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root cache directory (overrides config and BUF_CACHE_DIR)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cache prefix of a module digest
    Prefix(EntryArgs),

    /// List cache entries
    List(ListArgs),

    /// Show files and dependencies of a cache entry
    Show(EntryArgs),

    /// Recompute the digest of a cache entry
    Verify(EntryArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Identifies one cache entry
#[derive(Parser, Debug)]
pub struct EntryArgs {
    /// Module full name (registry/owner/name)
    pub module: String,

    /// Module digest (e.g., sha256:<hex>)
    pub digest: String,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Include partial entries left by interrupted writes
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.lock_file_version)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
