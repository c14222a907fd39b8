//! Helpers over bucket handles
//!
//! Every helper closes the handles it opens, on success and on failure,
//! and reports close errors together with the primary error.

use super::{PutOptions, ReadBucket, ReadObjectCloser, WriteBucket};
use crate::error::{CacheError, CacheResult, MultiError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read an entire object into memory
pub async fn read_path<B: ReadBucket + ?Sized>(bucket: &B, path: &str) -> CacheResult<Vec<u8>> {
    let mut reader = bucket.get(path).await?;
    let mut data = Vec::new();

    let mut errors = MultiError::new();
    if let Err(e) = reader.read_to_end(&mut data).await {
        errors.push(CacheError::io(format!("reading {}", path), e));
    }
    errors.collect(reader.close().await);
    errors.into_result().map(|()| data)
}

/// Atomically write `data` to `path`
pub async fn put_path<B: WriteBucket + ?Sized>(bucket: &B, path: &str, data: &[u8]) -> CacheResult<()> {
    let mut writer = bucket.put(path, PutOptions::atomic()).await?;
    match writer.write_all(data).await {
        Ok(()) => writer.close().await,
        Err(e) => {
            let mut errors = MultiError::new();
            errors.push(CacheError::io(format!("writing {}", path), e));
            errors.collect(writer.abort().await);
            errors.into_result()
        }
    }
}

/// Whether an object exists at `path`
pub async fn exists<B: ReadBucket + ?Sized>(bucket: &B, path: &str) -> CacheResult<bool> {
    match bucket.stat(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Every object path under `prefix`, in walk order
pub async fn all_paths<B: ReadBucket + ?Sized>(bucket: &B, prefix: &str) -> CacheResult<Vec<String>> {
    let mut paths = Vec::new();
    bucket
        .walk(prefix, &mut |info| {
            paths.push(info.path);
            Ok(())
        })
        .await?;
    Ok(paths)
}

/// Copy `reader` into `bucket` at `path` with an atomic put
///
/// Both the destination writer and `reader` are always closed. If the copy
/// fails the destination is aborted rather than committed, so a partial
/// object never becomes visible. The copy error and any close errors are
/// combined into one error. Returns the number of bytes copied.
pub async fn copy_read_object<B: WriteBucket + ?Sized>(
    bucket: &B,
    path: &str,
    mut reader: Box<dyn ReadObjectCloser>,
) -> CacheResult<u64> {
    let mut errors = MultiError::new();
    let mut copied = 0;

    match bucket.put(path, PutOptions::atomic()).await {
        Ok(mut writer) => match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(n) => {
                copied = n;
                errors.collect(writer.close().await);
            }
            Err(e) => {
                errors.push(CacheError::io(
                    format!("copying {} to {}", reader.info().path, path),
                    e,
                ));
                errors.collect(writer.abort().await);
            }
        },
        Err(e) => errors.push(e),
    }

    errors.collect(reader.close().await);
    errors.into_result().map(|()| copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemBucket, ObjectInfo, WriteObjectCloser};
    use async_trait::async_trait;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    /// Reader serving `hello` once, optionally failing reads or close
    struct FlakyReader {
        info: ObjectInfo,
        fail_read: bool,
        fail_close: bool,
        drained: bool,
        closed: Arc<AtomicBool>,
    }

    impl FlakyReader {
        fn new(fail_read: bool, fail_close: bool) -> (Box<Self>, Arc<AtomicBool>) {
            let closed = Arc::new(AtomicBool::new(false));
            let reader = Box::new(Self {
                info: ObjectInfo {
                    path: "src.proto".to_string(),
                    size: 5,
                    modified: None,
                },
                fail_read,
                fail_close,
                drained: false,
                closed: Arc::clone(&closed),
            });
            (reader, closed)
        }
    }

    impl AsyncRead for FlakyReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.fail_read {
                return Poll::Ready(Err(io::Error::other("disk on fire")));
            }
            if !self.drained {
                self.drained = true;
                buf.put_slice(b"hello");
            }
            Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl ReadObjectCloser for FlakyReader {
        fn info(&self) -> &ObjectInfo {
            &self.info
        }

        async fn close(&mut self) -> CacheResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            if self.fail_close {
                return Err(CacheError::Internal("close failed".to_string()));
            }
            Ok(())
        }
    }

    /// Bucket whose writers fail on close
    struct FailingCloseBucket;

    struct FailingWriter(String);

    impl tokio::io::AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
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
    impl WriteObjectCloser for FailingWriter {
        fn path(&self) -> &str {
            &self.0
        }

        async fn close(&mut self) -> CacheResult<()> {
            Err(CacheError::Internal("commit failed".to_string()))
        }

        async fn abort(&mut self) -> CacheResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl WriteBucket for FailingCloseBucket {
        async fn put(
            &self,
            path: &str,
            _options: PutOptions,
        ) -> CacheResult<Box<dyn WriteObjectCloser>> {
            Ok(Box::new(FailingWriter(path.to_string())))
        }
    }

    #[tokio::test]
    async fn copy_writes_bytes_and_closes_reader() {
        let bucket = MemBucket::new();
        let (reader, closed) = FlakyReader::new(false, false);

        let copied = copy_read_object(&bucket, "dst.proto", reader).await.unwrap();

        assert_eq!(copied, 5);
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(read_path(&bucket, "dst.proto").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn failed_copy_publishes_nothing() {
        let bucket = MemBucket::new();
        let (reader, closed) = FlakyReader::new(true, false);

        let err = copy_read_object(&bucket, "dst.proto", reader).await.unwrap_err();

        assert!(err.to_string().contains("copying src.proto to dst.proto"));
        assert!(closed.load(Ordering::SeqCst));
        assert!(!exists(&bucket, "dst.proto").await.unwrap());
    }

    #[tokio::test]
    async fn copy_and_close_errors_are_combined() {
        let bucket = MemBucket::new();
        let (reader, closed) = FlakyReader::new(true, true);

        let err = copy_read_object(&bucket, "dst.proto", reader).await.unwrap_err();

        assert!(closed.load(Ordering::SeqCst));
        match err {
            CacheError::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected combined error, got {}", other),
        }
    }

    #[tokio::test]
    async fn writer_close_failure_still_closes_reader() {
        let (reader, closed) = FlakyReader::new(false, true);

        let err = copy_read_object(&FailingCloseBucket, "dst.proto", reader)
            .await
            .unwrap_err();

        assert!(closed.load(Ordering::SeqCst));
        let message = err.to_string();
        assert!(message.contains("commit failed"));
        assert!(message.contains("close failed"));
    }

    #[tokio::test]
    async fn failed_put_still_closes_reader() {
        let bucket = MemBucket::new();
        bucket.set_read_only(true);
        let (reader, closed) = FlakyReader::new(false, false);

        let err = copy_read_object(&bucket, "dst.proto", reader).await.unwrap_err();

        assert!(matches!(err, CacheError::ReadOnlyBucket(_)));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn exists_distinguishes_missing() {
        let bucket = MemBucket::from_files([("a", "1")]).unwrap();
        assert!(exists(&bucket, "a").await.unwrap());
        assert!(!exists(&bucket, "b").await.unwrap());
    }
}
