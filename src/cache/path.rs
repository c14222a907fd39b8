//! Content-addressed layout of cache entries
//!
//! ```text
//! <registry>/<owner>/<name>/<digest type>/<hex[0:2]>/<hex[2:]>/
//!   buf.lock
//!   files/<module file paths>
//! ```
//!
//! The two-character shard directory keeps directory fan-out bounded, the
//! same way git lays out its object store.

use crate::lockfile::LOCK_FILE_NAME;
use crate::module::{Digest, DigestType, ModuleFullName};
use crate::storage::path::join;

/// Directory under an entry prefix holding the module's files
pub const FILES_DIR: &str = "files";

/// Storage prefix of the cache entry for a module digest
pub fn cache_prefix(full_name: &ModuleFullName, digest: &Digest) -> String {
    let hex = digest.hex();
    let (shard, rest) = hex.split_at(2.min(hex.len()));
    format!(
        "{}/{}/{}/{}/{}/{}",
        full_name.registry(),
        full_name.owner(),
        full_name.name(),
        digest.digest_type(),
        shard,
        rest
    )
}

/// Prefix under which an entry's module files are stored
pub fn files_prefix(prefix: &str) -> String {
    join(prefix, FILES_DIR)
}

/// Path of an entry's lock file
pub fn lock_file_path(prefix: &str) -> String {
    join(prefix, LOCK_FILE_NAME)
}

/// Split an object path of the cache bucket into its entry and the path
/// within the entry
///
/// Returns `None` for paths that do not follow the layout.
pub fn parse_entry_path(path: &str) -> Option<(ModuleFullName, Digest, String)> {
    let components: Vec<&str> = path.split('/').collect();
    if components.len() < 7 {
        return None;
    }

    let full_name =
        ModuleFullName::new(components[0], components[1], components[2]).ok()?;
    let digest_type: DigestType = components[3].parse().ok()?;
    if components[4].len() != 2 {
        return None;
    }
    let value = hex::decode(format!("{}{}", components[4], components[5])).ok()?;
    let digest = Digest::new(digest_type, value).ok()?;
    // Reject non-canonical (uppercase) hex so each entry has one prefix
    if cache_prefix(&full_name, &digest) != components[..6].join("/") {
        return None;
    }

    Some((full_name, digest, components[6..].join("/")))
}
