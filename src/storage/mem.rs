//! In-memory bucket
//!
//! Objects are published to the shared map only when their writer closes,
//! so every put is atomic regardless of [`PutOptions`].

use super::path::{has_prefix, normalize, normalize_object_path};
use super::{ObjectInfo, PutOptions, ReadBucket, ReadObjectCloser, WriteBucket, WriteObjectCloser};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::RwLock;

type Objects = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

/// Bucket backed by an in-process map
#[derive(Debug, Clone, Default)]
pub struct MemBucket {
    objects: Objects,
    read_only: Arc<AtomicBool>,
}

impl MemBucket {
    /// Create an empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bucket holding the given files
    pub fn from_files<P, B>(files: impl IntoIterator<Item = (P, B)>) -> CacheResult<Self>
    where
        P: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        let mut objects = BTreeMap::new();
        for (path, data) in files {
            objects.insert(normalize_object_path(path.as_ref())?, data.into());
        }
        Ok(Self {
            objects: Arc::new(RwLock::new(objects)),
            read_only: Arc::default(),
        })
    }

    /// Reject all further puts when `read_only` is true
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Snapshot of every object, keyed by path
    pub async fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.objects.read().await.clone()
    }
}

fn object_info(path: &str, data: &[u8]) -> ObjectInfo {
    ObjectInfo {
        path: path.to_string(),
        size: data.len() as u64,
        modified: None,
    }
}

#[async_trait]
impl ReadBucket for MemBucket {
    async fn get(&self, path: &str) -> CacheResult<Box<dyn ReadObjectCloser>> {
        let path = normalize_object_path(path)?;
        let objects = self.objects.read().await;
        let data = objects
            .get(&path)
            .ok_or_else(|| CacheError::ObjectNotFound(path.clone()))?;

        Ok(Box::new(MemReadObject {
            info: object_info(&path, data),
            cursor: Cursor::new(data.clone()),
        }))
    }

    async fn stat(&self, path: &str) -> CacheResult<ObjectInfo> {
        let path = normalize_object_path(path)?;
        let objects = self.objects.read().await;
        objects
            .get(&path)
            .map(|data| object_info(&path, data))
            .ok_or(CacheError::ObjectNotFound(path))
    }

    async fn walk(
        &self,
        prefix: &str,
        visit: &mut (dyn FnMut(ObjectInfo) -> CacheResult<()> + Send),
    ) -> CacheResult<()> {
        let prefix = normalize(prefix)?;
        // Snapshot first so visitors never run under the lock
        let infos: Vec<ObjectInfo> = {
            let objects = self.objects.read().await;
            objects
                .iter()
                .filter(|(path, _)| has_prefix(path, &prefix))
                .map(|(path, data)| object_info(path, data))
                .collect()
        };

        for info in infos {
            visit(info)?;
        }
        Ok(())
    }
}

#[async_trait]
impl WriteBucket for MemBucket {
    async fn put(&self, path: &str, _options: PutOptions) -> CacheResult<Box<dyn WriteObjectCloser>> {
        let path = normalize_object_path(path)?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(CacheError::ReadOnlyBucket(path));
        }

        Ok(Box::new(MemWriteObject {
            path,
            buffer: Vec::new(),
            objects: Arc::clone(&self.objects),
            closed: false,
        }))
    }
}

struct MemReadObject {
    info: ObjectInfo,
    cursor: Cursor<Vec<u8>>,
}

impl AsyncRead for MemReadObject {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.cursor).poll_read(cx, buf)
    }
}

#[async_trait]
impl ReadObjectCloser for MemReadObject {
    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    async fn close(&mut self) -> CacheResult<()> {
        Ok(())
    }
}

struct MemWriteObject {
    path: String,
    buffer: Vec<u8>,
    objects: Objects,
    closed: bool,
}

impl AsyncWrite for MemWriteObject {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.closed {
            return Poll::Ready(Err(io::Error::other(format!(
                "write to closed object {}",
                self.path
            ))));
        }
        self.buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl WriteObjectCloser for MemWriteObject {
    fn path(&self) -> &str {
        &self.path
    }

    async fn close(&mut self) -> CacheResult<()> {
        if self.closed {
            return Err(CacheError::WriterClosed(self.path.clone()));
        }
        self.closed = true;
        let data = std::mem::take(&mut self.buffer);
        self.objects.write().await.insert(self.path.clone(), data);
        Ok(())
    }

    async fn abort(&mut self) -> CacheResult<()> {
        self.closed = true;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{put_path, read_path};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn put_and_get() {
        let bucket = MemBucket::new();
        put_path(&bucket, "a/b.proto", b"syntax = \"proto3\";").await.unwrap();

        let data = read_path(&bucket, "a/b.proto").await.unwrap();
        assert_eq!(data, b"syntax = \"proto3\";");
        assert_eq!(bucket.stat("a/b.proto").await.unwrap().size, 18);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let bucket = MemBucket::new();
        let err = bucket.get("nope").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn object_invisible_until_close() {
        let bucket = MemBucket::new();
        let mut writer = bucket.put("x", PutOptions::atomic()).await.unwrap();
        writer.write_all(b"partial").await.unwrap();
        assert!(bucket.stat("x").await.is_err());

        writer.close().await.unwrap();
        assert_eq!(read_path(&bucket, "x").await.unwrap(), b"partial");
    }

    #[tokio::test]
    async fn aborted_object_never_appears() {
        let bucket = MemBucket::new();
        let mut writer = bucket.put("x", PutOptions::default()).await.unwrap();
        writer.write_all(b"junk").await.unwrap();
        writer.abort().await.unwrap();
        assert!(bucket.is_empty().await);
        assert!(writer.close().await.is_err());
    }

    #[tokio::test]
    async fn walk_is_sorted_and_scoped() {
        let bucket =
            MemBucket::from_files([("b/2", "x"), ("a/1", "x"), ("b/1", "x"), ("bb/1", "x")])
                .unwrap();

        let mut seen = Vec::new();
        bucket
            .walk("b", &mut |info| {
                seen.push(info.path);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(seen, vec!["b/1", "b/2"]);
    }

    #[tokio::test]
    async fn read_only_rejects_puts() {
        let bucket = MemBucket::new();
        bucket.set_read_only(true);
        let err = bucket.put("x", PutOptions::atomic()).await.err().unwrap();
        assert!(matches!(err, CacheError::ReadOnlyBucket(_)));
    }
}
