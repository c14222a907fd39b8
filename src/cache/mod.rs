//! Content-addressed module cache
//!
//! Module data is cached under a prefix derived from the module's full name
//! and digest. An entry stores the module files under `files/` and its
//! declared dependencies in a `buf.lock` file.
//!
//! # Entry States
//!
//! | State | Lock file | Served |
//! |-------|-----------|--------|
//! | Absent | - | no, delegate is asked |
//! | Partial | missing | no, rewritten on next miss |
//! | Complete | present | yes |
//!
//! The lock file is written last, so a crash mid-write leaves a partial
//! entry rather than a corrupt one.

pub mod inspect;
pub mod path;
pub mod provider;
pub mod report;

pub use inspect::{
    format_bytes, list_entries, show_entry, verify_entry, CacheEntry, EntryDetails, EntryState,
};
pub use path::{cache_prefix, files_prefix, lock_file_path, parse_entry_path};
pub use provider::CachedModuleDataProvider;
pub use report::{CacheErrorReporter, CollectingReporter, TracingReporter};
