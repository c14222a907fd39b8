//! Bucket path handling
//!
//! Bucket paths are relative, `/`-separated, and never contain `.` or `..`
//! components. The empty path denotes the bucket root and is only valid as a
//! walk prefix.
//!
//! The top-level name [`STAGING_DIR`] is reserved for in-flight writes and
//! is rejected as a first component.

use crate::error::{CacheError, CacheResult};

/// Top-level directory reserved for buckets to stage writes in
pub const STAGING_DIR: &str = ".bufcache-staging";

/// Normalize a bucket path or prefix
pub fn normalize(path: &str) -> CacheResult<String> {
    if path.starts_with('/') {
        return Err(CacheError::invalid_path(path, "must be relative"));
    }
    if path.contains('\\') {
        return Err(CacheError::invalid_path(path, "must use / as separator"));
    }

    let mut components = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => return Err(CacheError::invalid_path(path, "must not contain ..")),
            other => components.push(other),
        }
    }
    if components.first() == Some(&STAGING_DIR) {
        return Err(CacheError::invalid_path(path, "uses a reserved name"));
    }
    Ok(components.join("/"))
}

/// Normalize a path that must name an object (non-empty)
pub fn normalize_object_path(path: &str) -> CacheResult<String> {
    let normalized = normalize(path)?;
    if normalized.is_empty() {
        return Err(CacheError::invalid_path(path, "must not be empty"));
    }
    Ok(normalized)
}

/// Join two normalized paths
pub fn join(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base, path),
    }
}

/// Whether `path` equals `prefix` or lies underneath it
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Strip `prefix` from `path`, returning the remainder relative to it
pub fn relative<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}
