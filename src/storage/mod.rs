//! Key-value byte storage
//!
//! A bucket maps normalized relative paths to byte objects. The cache reads
//! module files and lock files through [`ReadBucket`] and writes them through
//! [`WriteBucket`]; both are object-safe so providers can hold
//! `Arc<dyn ReadWriteBucket>` regardless of the backing store.
//!
//! # Implementations
//!
//! | Bucket | Backing | Atomic puts |
//! |--------|---------|-------------|
//! | [`MemBucket`] | in-process map | always (published on close) |
//! | [`OsBucket`] | directory on disk | temp file + rename |
//! | [`MappedReadBucket`] | prefix of another bucket | read-only |

pub mod mapped;
pub mod mem;
pub mod os;
pub mod path;
pub mod util;

pub use mapped::MappedReadBucket;
pub use mem::MemBucket;
pub use os::OsBucket;
pub use util::{all_paths, copy_read_object, exists, put_path, read_path};

use crate::error::CacheResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite};

/// Metadata about a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Normalized path relative to the bucket root
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, when the backing store tracks one
    pub modified: Option<DateTime<Utc>>,
}

/// Options for [`WriteBucket::put`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Make the object visible at its final path only once fully written
    pub atomic: bool,
}

impl PutOptions {
    pub fn atomic() -> Self {
        Self { atomic: true }
    }
}

/// A readable object handle that must be closed
#[async_trait]
pub trait ReadObjectCloser: AsyncRead + Send + Unpin {
    /// Metadata of the object being read
    fn info(&self) -> &ObjectInfo;

    /// Release the handle
    async fn close(&mut self) -> CacheResult<()>;
}

/// A writable object handle
///
/// Nothing written is guaranteed visible until [`close`](Self::close)
/// succeeds. [`abort`](Self::abort) discards the write.
#[async_trait]
pub trait WriteObjectCloser: AsyncWrite + Send + Unpin {
    /// Destination path of the object
    fn path(&self) -> &str;

    /// Flush and publish the object
    async fn close(&mut self) -> CacheResult<()>;

    /// Discard everything written so far
    async fn abort(&mut self) -> CacheResult<()>;
}

/// Read access to a bucket
#[async_trait]
pub trait ReadBucket: Send + Sync {
    /// Open an object for reading
    ///
    /// Returns `CacheError::ObjectNotFound` if no object exists at `path`.
    async fn get(&self, path: &str) -> CacheResult<Box<dyn ReadObjectCloser>>;

    /// Get metadata for an object
    async fn stat(&self, path: &str) -> CacheResult<ObjectInfo>;

    /// Visit every object under `prefix` in path order
    async fn walk(
        &self,
        prefix: &str,
        visit: &mut (dyn FnMut(ObjectInfo) -> CacheResult<()> + Send),
    ) -> CacheResult<()>;
}

/// Write access to a bucket
#[async_trait]
pub trait WriteBucket: Send + Sync {
    /// Open an object for writing
    async fn put(&self, path: &str, options: PutOptions) -> CacheResult<Box<dyn WriteObjectCloser>>;
}

/// A bucket that can be both read and written
pub trait ReadWriteBucket: ReadBucket + WriteBucket {}

impl<T: ReadBucket + WriteBucket + ?Sized> ReadWriteBucket for T {}
