//! Error types for bufcache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for bufcache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in bufcache
#[derive(Error, Debug)]
pub enum CacheError {
    // Module identity errors
    #[error("Invalid module full name {name:?}: {reason}")]
    InvalidModuleFullName { name: String, reason: String },

    #[error("Invalid digest {value:?}: {reason}")]
    InvalidDigest { value: String, reason: String },

    #[error("Unknown digest type: {0}")]
    UnknownDigestType(String),

    #[error("Digest mismatch for {module}: expected {expected}, got {actual}")]
    DigestMismatch {
        module: String,
        expected: String,
        actual: String,
    },

    // Storage errors
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Object writer for {0} already closed")]
    WriterClosed(String),

    #[error("Bucket is read-only, cannot write {0}")]
    ReadOnlyBucket(String),

    // Lock file errors
    #[error("Invalid lock file {path}: {reason}")]
    LockFileInvalid { path: String, reason: String },

    // Provider errors
    #[error("Delegate returned {actual} module datas for {expected} module keys")]
    DelegateResultMismatch { expected: usize, actual: usize },

    #[error("Delegate returned module data for {actual} when {expected} was requested")]
    ModuleKeyMismatch { expected: String, actual: String },

    #[error("Cache entry not found: {0}")]
    CacheEntryNotFound(String),

    #[error("Failed to cache {module}: {source}")]
    CacheWrite {
        module: String,
        #[source]
        source: Box<CacheError>,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache directory could not be determined")]
    CacheDirUnknown,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Aggregates
    #[error("{0}")]
    Multiple(MultiError),

    #[error(transparent)]
    Shared(Arc<CacheError>),

    // General errors
    #[error("{0}")]
    User(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a lock file error
    pub fn lock_file_invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LockFileInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error means the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ObjectNotFound(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::Shared(inner) => inner.is_not_found(),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheDirUnknown => Some("Set BUF_CACHE_DIR or [cache] dir in the config file"),
            Self::CacheEntryNotFound(_) => Some("Run: bufcache list"),
            Self::InvalidDigest { .. } => Some("Digests look like sha256:<hex>"),
            Self::InvalidModuleFullName { .. } => {
                Some("Module names look like buf.build/owner/name")
            }
            _ => None,
        }
    }
}

/// Accumulates errors from independent operations without short-circuiting
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<CacheError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn push(&mut self, error: CacheError) {
        self.errors.push(error);
    }

    /// Record the error of a result, if any
    pub fn collect<T>(&mut self, result: CacheResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CacheError] {
        &self.errors
    }

    /// Collapse into a single result
    ///
    /// Zero errors is `Ok(())`, one error is returned as-is, several are
    /// wrapped in `CacheError::Multiple`.
    pub fn into_result(mut self) -> CacheResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(CacheError::Multiple(self)),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl FromIterator<CacheError> for MultiError {
    fn from_iter<I: IntoIterator<Item = CacheError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}
