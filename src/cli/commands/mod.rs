//! CLI command implementations

pub mod config;
pub mod list;
pub mod prefix;
pub mod show;
pub mod verify;

pub use config::execute as config;
pub use list::execute as list;
pub use prefix::execute as prefix;
pub use show::execute as show;
pub use verify::execute as verify;

use crate::cli::args::EntryArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::module::{Digest, ModuleFullName};
use crate::storage::OsBucket;
use tracing::debug;

/// Open the module cache of the configured cache directory
fn open_module_cache(config: &Config) -> CacheResult<OsBucket> {
    let dir = config.module_cache_dir()?;
    debug!("Using module cache at {}", dir.display());
    Ok(OsBucket::new(dir))
}

fn parse_entry_args(args: &EntryArgs) -> CacheResult<(ModuleFullName, Digest)> {
    Ok((args.module.parse()?, args.digest.parse()?))
}
