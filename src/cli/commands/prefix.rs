//! Prefix command - print where an entry is stored

use super::parse_entry_args;
use crate::cache::cache_prefix;
use crate::cli::args::EntryArgs;
use crate::config::Config;
use crate::error::CacheResult;

/// Execute the prefix command
pub async fn execute(args: EntryArgs, _config: &Config) -> CacheResult<()> {
    let (full_name, digest) = parse_entry_args(&args)?;
    println!("{}", cache_prefix(&full_name, &digest));
    Ok(())
}
