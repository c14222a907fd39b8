//! Show command - print the contents of a cache entry

use super::{open_module_cache, parse_entry_args};
use crate::cache::{cache_prefix, format_bytes, show_entry};
use crate::cli::args::EntryArgs;
use crate::config::Config;
use crate::error::CacheResult;
use console::style;
use std::sync::Arc;

/// Execute the show command
pub async fn execute(args: EntryArgs, config: &Config) -> CacheResult<()> {
    let (full_name, digest) = parse_entry_args(&args)?;
    let bucket = open_module_cache(config)?;
    let details = show_entry(Arc::new(bucket), &full_name, &digest).await?;

    println!("{} {}", style("Module:").bold(), details.full_name);
    println!("{} {}", style("Digest:").bold(), details.digest);
    println!("{} {}", style("Prefix:").bold(), cache_prefix(&full_name, &digest));
    println!(
        "{} {}",
        style("Lock file:").bold(),
        details.lock_file.version()
    );
    println!();

    println!("{} ({})", style("Files").bold(), details.files.len());
    for file in &details.files {
        println!("  {:<60} {:>10}", file.path, format_bytes(file.size));
    }
    println!();

    let deps = details.dep_module_keys();
    println!("{} ({})", style("Dependencies").bold(), deps.len());
    for dep in deps {
        let dep_digest = dep.digest().await?;
        println!("  {} {}", dep, style(dep_digest).dim());
    }

    Ok(())
}
