//! Read-only inspection of a module cache bucket

use super::path::{cache_prefix, files_prefix, parse_entry_path, FILES_DIR};
use crate::error::{CacheError, CacheResult};
use crate::lockfile::{read_lock_file, LockFile, LOCK_FILE_NAME};
use crate::module::{module_digest, Digest, ModuleFullName, ModuleKey};
use crate::storage::{MappedReadBucket, ObjectInfo, ReadBucket};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Whether a cache entry can be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Files without a lock file, left by an interrupted write
    Partial,
    /// Lock file present
    Complete,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial => write!(f, "partial"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Summary of one cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub full_name: ModuleFullName,
    pub digest: Digest,
    pub state: EntryState,
    /// Number of module files, excluding the lock file
    pub file_count: usize,
    /// Total size of module files
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn prefix(&self) -> String {
        cache_prefix(&self.full_name, &self.digest)
    }
}

/// Contents of a complete cache entry
#[derive(Debug, Clone)]
pub struct EntryDetails {
    pub full_name: ModuleFullName,
    pub digest: Digest,
    /// Module files, with paths relative to the module root
    pub files: Vec<ObjectInfo>,
    pub lock_file: LockFile,
}

impl EntryDetails {
    pub fn dep_module_keys(&self) -> &[ModuleKey] {
        self.lock_file.dep_module_keys()
    }
}

/// List every entry in a cache bucket, ordered by prefix
///
/// Objects outside the cache layout are skipped.
pub async fn list_entries<B: ReadBucket + ?Sized>(bucket: &B) -> CacheResult<Vec<CacheEntry>> {
    let mut entries: BTreeMap<String, CacheEntry> = BTreeMap::new();

    bucket
        .walk("", &mut |info: ObjectInfo| {
            let Some((full_name, digest, rest)) = parse_entry_path(&info.path) else {
                return Ok(());
            };
            let entry = entries
                .entry(cache_prefix(&full_name, &digest))
                .or_insert_with(|| CacheEntry {
                    full_name,
                    digest,
                    state: EntryState::Partial,
                    file_count: 0,
                    size_bytes: 0,
                });

            if rest == LOCK_FILE_NAME {
                entry.state = EntryState::Complete;
            } else if rest.starts_with(&format!("{}/", FILES_DIR)) {
                entry.file_count += 1;
                entry.size_bytes += info.size;
            }
            Ok(())
        })
        .await?;

    Ok(entries.into_values().collect())
}

/// Read the lock file and file listing of a complete entry
pub async fn show_entry(
    bucket: Arc<dyn ReadBucket>,
    full_name: &ModuleFullName,
    digest: &Digest,
) -> CacheResult<EntryDetails> {
    let (lock_file, files_bucket) = open_entry(bucket, full_name, digest).await?;

    let mut files = Vec::new();
    files_bucket
        .walk("", &mut |info: ObjectInfo| {
            files.push(info);
            Ok(())
        })
        .await?;

    Ok(EntryDetails {
        full_name: full_name.clone(),
        digest: digest.clone(),
        files,
        lock_file,
    })
}

/// Recompute the digest of a complete entry and compare it to `digest`
///
/// Uses the entry's files and the dependency digests recorded in its lock
/// file.
pub async fn verify_entry(
    bucket: Arc<dyn ReadBucket>,
    full_name: &ModuleFullName,
    digest: &Digest,
) -> CacheResult<()> {
    let (lock_file, files_bucket) = open_entry(bucket, full_name, digest).await?;

    let mut dep_digests = Vec::new();
    for dep in lock_file.dep_module_keys() {
        dep_digests.push(dep.digest().await?);
    }

    let actual = module_digest(digest.digest_type(), &files_bucket, &dep_digests).await?;
    if &actual != digest {
        return Err(CacheError::DigestMismatch {
            module: full_name.to_string(),
            expected: digest.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

async fn open_entry(
    bucket: Arc<dyn ReadBucket>,
    full_name: &ModuleFullName,
    digest: &Digest,
) -> CacheResult<(LockFile, MappedReadBucket<dyn ReadBucket>)> {
    let prefix = cache_prefix(full_name, digest);
    let lock_file = read_lock_file(bucket.as_ref(), &prefix)
        .await?
        .ok_or_else(|| CacheError::CacheEntryNotFound(format!("{} {}", full_name, digest)))?;
    let files_bucket = MappedReadBucket::new(bucket, &files_prefix(&prefix))?;
    Ok((lock_file, files_bucket))
}
