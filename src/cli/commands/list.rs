//! List command - show module cache entries

use super::open_module_cache;
use crate::cache::{format_bytes, list_entries, CacheEntry, EntryState};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::CacheResult;
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> CacheResult<()> {
    let bucket = open_module_cache(config)?;
    let entries = list_entries(&bucket).await?;

    let filtered: Vec<_> = if args.all {
        entries
    } else {
        entries
            .into_iter()
            .filter(|e| e.state == EntryState::Complete)
            .collect()
    };

    if filtered.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cache entries found."),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&filtered),
        OutputFormat::Json => print_json(&filtered)?,
        OutputFormat::Plain => print_plain(&filtered),
    }

    Ok(())
}

fn print_table(entries: &[CacheEntry]) {
    println!(
        "{:<40} {:<20} {:<10} {:>6} {:>10}",
        style("MODULE").bold(),
        style("DIGEST").bold(),
        style("STATE").bold(),
        style("FILES").bold(),
        style("SIZE").bold()
    );
    println!("{}", "-".repeat(90));

    let mut total_bytes = 0;
    for entry in entries {
        let state_styled = match entry.state {
            EntryState::Complete => style("complete").green(),
            EntryState::Partial => style("partial").yellow(),
        };

        let digest = entry.digest.to_string();
        let short_digest: String = digest.chars().take(20).collect();
        total_bytes += entry.size_bytes;

        println!(
            "{:<40} {:<20} {:<10} {:>6} {:>10}",
            entry.full_name,
            short_digest,
            state_styled,
            entry.file_count,
            format_bytes(entry.size_bytes)
        );
    }

    println!();
    println!(
        "{} entr{}, {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        format_bytes(total_bytes)
    );
}

fn print_json(entries: &[CacheEntry]) -> CacheResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson {
        module: String,
        digest: String,
        state: String,
        prefix: String,
        file_count: usize,
        size_bytes: u64,
    }

    let json_entries: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            module: e.full_name.to_string(),
            digest: e.digest.to_string(),
            state: e.state.to_string(),
            prefix: e.prefix(),
            file_count: e.file_count,
            size_bytes: e.size_bytes,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_entries)?);
    Ok(())
}

fn print_plain(entries: &[CacheEntry]) {
    for entry in entries {
        println!("{} {}", entry.full_name, entry.digest);
    }
}
