//! Verify command - check an entry against its digest

use super::{open_module_cache, parse_entry_args};
use crate::cache::verify_entry;
use crate::cli::args::EntryArgs;
use crate::config::Config;
use crate::error::CacheResult;
use console::style;
use std::sync::Arc;

/// Execute the verify command
pub async fn execute(args: EntryArgs, config: &Config) -> CacheResult<()> {
    let (full_name, digest) = parse_entry_args(&args)?;
    let bucket = open_module_cache(config)?;

    verify_entry(Arc::new(bucket), &full_name, &digest).await?;

    println!("{} {} {}", style("✓").green(), full_name, digest);
    Ok(())
}
